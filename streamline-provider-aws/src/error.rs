//! Errors raised while declaring or synthesising a Streamline stack

use std::path::PathBuf;

use streamline_core::SynthError;

use crate::check::Diagnostic;

/// Declaration-time failure. No template is produced when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("Invalid stack name '{0}': it must contain at least one letter or digit")]
    InvalidStackName(String),

    #[error("Invalid CIDR block '{cidr}': {reason}")]
    InvalidCidr { cidr: String, reason: String },

    #[error("Availability zone count must be between 1 and {max}, got {count}")]
    ZoneCount { count: usize, max: usize },

    #[error("Invalid NAT gateway count {count}: {reason}")]
    NatCount { count: usize, reason: String },

    #[error("Address block {cidr} cannot hold {requested} subnets of /{mask}")]
    SubnetSpace {
        cidr: String,
        requested: usize,
        mask: u8,
    },

    #[error(
        "Capacity bounds violated: expected min ({min}) <= desired ({desired}) <= max ({max})"
    )]
    CapacityBounds { min: u32, desired: u32, max: u32 },

    #[error("Placement '{placement}' names subnets that network '{network}' does not declare")]
    Placement { placement: String, network: String },

    #[error("HTTPS listener on port {port} requires a certificate ARN")]
    MissingCertificate { port: u16 },

    #[error("Invalid machine image '{0}': expected amazon-linux-2, amazon-linux or an ami- ID")]
    MachineImage(String),

    #[error("Invalid scaling policy: {0}")]
    Scaling(String),

    #[error(
        "Unknown preset '{0}', expected one of: {presets}",
        presets = crate::config::PRESETS.join(", ")
    )]
    UnknownPreset(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Consistency check failed:\n{}", format_diagnostics(.0))]
    Check(Vec<Diagnostic>),

    #[error(transparent)]
    Synth(#[from] SynthError),
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {}", d))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Severity;

    #[test]
    fn capacity_bounds_message() {
        let err = StackError::CapacityBounds {
            min: 2,
            desired: 5,
            max: 4,
        };
        assert_eq!(
            err.to_string(),
            "Capacity bounds violated: expected min (2) <= desired (5) <= max (4)"
        );
    }

    #[test]
    fn unknown_preset_names_the_choices() {
        let err = StackError::UnknownPreset("ecs".to_string());
        assert_eq!(
            err.to_string(),
            "Unknown preset 'ecs', expected one of: alb, streamline, private, fleet"
        );
    }

    #[test]
    fn check_error_lists_diagnostics() {
        let err = StackError::Check(vec![Diagnostic::new(
            Severity::Error,
            "StreamlineAutoScalingGroup",
            "unreachable",
        )]);
        let message = err.to_string();
        assert!(message.starts_with("Consistency check failed:"));
        assert!(message.contains("StreamlineAutoScalingGroup"));
    }
}
