//! AWS-specific type definitions

use regex::Regex;
use std::sync::LazyLock;

use streamline_core::resource::Value;
use streamline_core::schema::AttributeType;

/// Instance type names look like `t2.micro`, `m5.large`, `c6gn.16xlarge`
static INSTANCE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9-]*\.[a-z0-9]+$").expect("instance type pattern is valid")
});

/// Port number type (with validation)
pub fn port_number() -> AttributeType {
    AttributeType::Custom {
        name: "PortNumber".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| {
            if let Value::Int(n) = value {
                if (0..=65535).contains(n) {
                    Ok(())
                } else {
                    Err("Port number must be between 0 and 65535".to_string())
                }
            } else {
                Err("Expected integer".to_string())
            }
        },
    }
}

/// Port used by ICMP rules and the egress placeholder, where -1 means "all"
pub fn rule_port() -> AttributeType {
    AttributeType::Custom {
        name: "RulePort".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| match value {
            Value::Int(n) if (-1..=65535).contains(n) => Ok(()),
            Value::Int(n) => Err(format!("Port {} is outside -1..=65535", n)),
            _ => Err("Expected integer".to_string()),
        },
    }
}

/// IP protocol for security group rules
pub fn ip_protocol() -> AttributeType {
    AttributeType::Enum(vec![
        "tcp".to_string(),
        "udp".to_string(),
        "icmp".to_string(),
        "-1".to_string(), // All traffic
    ])
}

/// Load balancer listener / target group protocol
pub fn application_protocol() -> AttributeType {
    AttributeType::Enum(vec!["HTTP".to_string(), "HTTPS".to_string()])
}

/// EC2 instance type (e.g., "t2.micro")
pub fn instance_type() -> AttributeType {
    AttributeType::Custom {
        name: "InstanceType".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if INSTANCE_TYPE.is_match(s) => Ok(()),
            Value::String(s) => Err(format!(
                "Invalid instance type '{}', expected format like t2.micro",
                s
            )),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// Non-negative integer carried as a string (Auto Scaling sizes)
pub fn numeric_string() -> AttributeType {
    AttributeType::Custom {
        name: "NumericString".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if s.parse::<u32>().is_ok() => Ok(()),
            Value::String(s) => Err(format!("'{}' is not a non-negative integer", s)),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// ARN type (e.g., "arn:aws:acm:us-east-1:123456789012:certificate/abc")
pub fn arn() -> AttributeType {
    AttributeType::Custom {
        name: "Arn".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if s.starts_with("arn:") && s.split(':').count() >= 6 => Ok(()),
            Value::String(s) => Err(format!("Invalid ARN '{}'", s)),
            _ => Err("Expected string".to_string()),
        },
    }
}
