//! Builder - Declares the whole stack from a configuration
//!
//! Components are declared in dependency order: network, access groups,
//! role, load balancer, compute pool. Declaration validates each component;
//! [`StreamlineStack::synth`] then runs the consistency checks and renders
//! the template.

use heck::ToUpperCamelCase;
use streamline_core::stack::Parameter;
use streamline_core::{Stack, Template, Value};

use crate::AwsProvider;
use crate::access::{AccessGroup, Peer};
use crate::boot_script::{BootScript, ScriptReport};
use crate::check::{self, Diagnostic};
use crate::compute::{Capacity, MachineImage, ScalablePool};
use crate::config::{PortRange, StackConfig};
use crate::error::StackError;
use crate::identity::{ComputeRole, SSM_MANAGED_INSTANCE_CORE};
use crate::load_balancer::{ListenerProtocol, LoadBalancer};
use crate::network::NetworkBoundary;

const HTTPS_PORT: u16 = 443;
const SSH_PORT: u16 = 22;

/// Name of the template parameter resolving the machine image
pub const MACHINE_IMAGE_PARAMETER: &str = "MachineImageId";

/// Name of the stack output exporting the load balancer DNS name
pub const DNS_NAME_OUTPUT: &str = "LoadBalancerDnsName";

/// Declared components of a stack, ready to be checked and synthesised
#[derive(Debug, Clone)]
pub struct StreamlineStack {
    pub name: String,
    pub description: Option<String>,
    pub network: NetworkBoundary,
    pub load_balancer_group: AccessGroup,
    pub instance_group: AccessGroup,
    pub role: ComputeRole,
    pub load_balancer: LoadBalancer,
    pub pool: ScalablePool,
    pub boot_script: String,
    pub boot_report: ScriptReport,
    image_parameter: Option<Parameter>,
}

/// Declare every component described by `config`
pub fn build_stack(config: &StackConfig) -> Result<StreamlineStack, StackError> {
    let prefix = config.stack_name.to_upper_camel_case();
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StackError::InvalidStackName(config.stack_name.clone()));
    }

    let network = NetworkBoundary::declare(&prefix, &config.network)?;

    let exposure = &config.exposure;
    let mut load_balancer_group = AccessGroup::new(
        format!("{}LoadBalancerSecurityGroup", prefix),
        &network,
        "Allows internet traffic to the load balancer",
        true,
    );
    for &port in &exposure.ports {
        load_balancer_group.add_ingress_rule(
            Peer::AnyIpv4,
            PortRange::single(port),
            format!("Allow port {} from anywhere", port),
        );
    }

    let mut instance_group = AccessGroup::new(
        format!("{}InstanceSecurityGroup", prefix),
        &network,
        "Allows load balancer traffic to the instances",
        true,
    );
    for range in &config.instances.ingress_from_load_balancer {
        instance_group.add_ingress_rule(
            Peer::Group(load_balancer_group.logical_id.clone()),
            *range,
            format!("Allow port {} from the load balancer", range),
        );
    }
    if exposure.admin_ssh {
        instance_group.add_ingress_rule(
            Peer::Cidr(exposure.admin_cidr.clone()),
            PortRange::single(SSH_PORT),
            "Allow administrative SSH",
        );
    }

    let mut role = ComputeRole::new(format!("{}InstanceRole", prefix));
    if config.instances.ssm_access {
        role.add_managed_policy(SSM_MANAGED_INSTANCE_CORE);
    }

    let lb_config = &config.load_balancer;
    let mut load_balancer =
        LoadBalancer::new(format!("{}LoadBalancer", prefix), &network, &load_balancer_group)
            .with_name(lb_config.name.clone());
    if !lb_config.internet_facing {
        load_balancer = load_balancer.internal();
    }
    let target_group = load_balancer
        .add_target_group(
            format!("{}TargetGroup", prefix),
            lb_config.target_port,
            lb_config.health_check.clone(),
        )
        .clone();
    declare_listeners(config, &mut load_balancer, &target_group.logical_id)?;

    let boot_script = match &config.instances.user_data_file {
        Some(path) => std::fs::read_to_string(path).map_err(|source| StackError::Io {
            path: path.clone(),
            source,
        })?,
        None => BootScript::for_application(&config.application).render(),
    };
    let boot_report = BootScript::inspect(&boot_script);

    let image = MachineImage::parse(&config.instances.machine_image)?;
    let (image_id, image_parameter) = match &image {
        MachineImage::Ami(id) => (Value::from(id.as_str()), None),
        _ => (
            Value::Ref(MACHINE_IMAGE_PARAMETER.to_string()),
            image.ssm_parameter().map(|path| {
                Parameter::new("AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>")
                    .with_default(path)
                    .with_description("Machine image resolved from a public SSM parameter")
            }),
        ),
    };

    let instances = &config.instances;
    let mut pool = ScalablePool::new(
        format!("{}AutoScalingGroup", prefix),
        &network,
        instances.placement,
        Capacity::try_from(instances.capacity)?,
        image_id,
    )?
    .with_instance_type(instances.instance_type.as_str())
    .with_key_name(instances.key_name.clone())
    .with_access_group(&instance_group)
    .with_role(&role)
    .with_user_data(boot_script.as_str())
    .with_block_devices(instances.block_devices.clone())
    .with_grace_period(instances.grace_period_seconds);
    pool.register_with(&target_group);
    if let Some(scaling) = &instances.scaling {
        pool.with_scaling(scaling.clone())?;
    }

    log::info!("declared stack '{}'", config.stack_name);
    Ok(StreamlineStack {
        name: config.stack_name.clone(),
        description: config.description.clone(),
        network,
        load_balancer_group,
        instance_group,
        role,
        load_balancer,
        pool,
        boot_script,
        boot_report,
        image_parameter,
    })
}

/// One listener per exposed port; 443 only when a certificate is configured
fn declare_listeners(
    config: &StackConfig,
    load_balancer: &mut LoadBalancer,
    target_group: &str,
) -> Result<(), StackError> {
    let exposure = &config.exposure;
    let certificate = exposure
        .certificate_arn
        .as_ref()
        .filter(|arn| !arn.trim().is_empty());

    if exposure.redirect_http && certificate.is_none() {
        return Err(StackError::MissingCertificate { port: HTTPS_PORT });
    }

    for &port in &exposure.ports {
        if port == HTTPS_PORT {
            match certificate {
                Some(arn) => {
                    load_balancer.add_listener(
                        port,
                        ListenerProtocol::Https {
                            certificate_arn: arn.clone(),
                        },
                        &[target_group],
                    )?;
                }
                None => log::debug!("port {} is exposed without a certificate", port),
            }
        } else if exposure.redirect_http {
            load_balancer.add_redirect_listener(port, HTTPS_PORT);
        } else {
            load_balancer.add_listener(port, ListenerProtocol::Http, &[target_group])?;
        }
    }
    Ok(())
}

impl StreamlineStack {
    /// Run every consistency check
    pub fn check(&self) -> Vec<Diagnostic> {
        check::check(self)
    }

    /// Lower the declared components into a provider-agnostic stack
    pub fn to_stack(&self) -> Result<Stack, StackError> {
        let mut stack = Stack::new(&self.name);
        if let Some(description) = &self.description {
            stack = stack.with_description(description.as_str());
        }

        if let Some(parameter) = &self.image_parameter {
            stack.add_parameter(MACHINE_IMAGE_PARAMETER, parameter.clone())?;
        }
        stack.add_all(self.network.resources().iter().cloned())?;
        stack.add_all(self.load_balancer_group.resources())?;
        stack.add_all(self.instance_group.resources())?;
        stack.add_all(self.role.resources())?;
        stack.add_all(self.load_balancer.resources())?;
        stack.add_all(self.pool.resources())?;

        stack.add_output(
            DNS_NAME_OUTPUT,
            self.load_balancer.dns_name(),
            Some("Public DNS name of the load balancer".to_string()),
        );
        Ok(stack)
    }

    /// Check, then render the template
    ///
    /// Warnings are logged; any error diagnostic aborts synthesis.
    pub fn synth(&self) -> Result<Template, StackError> {
        let (errors, warnings): (Vec<Diagnostic>, Vec<Diagnostic>) =
            self.check().into_iter().partition(Diagnostic::is_error);
        for warning in &warnings {
            log::warn!("{}", warning);
        }
        if !errors.is_empty() {
            return Err(StackError::Check(errors));
        }

        let stack = self.to_stack()?;
        Ok(streamline_core::synth(&stack, &AwsProvider)?)
    }
}

/// Build, check and synthesise in one step
pub fn synth_config(config: &StackConfig) -> Result<Template, StackError> {
    build_stack(config)?.synth()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ScalingConfig, ScalingMetric, SubnetLayout, SubnetType, Supervision, PRESETS,
    };
    use tempfile::TempDir;

    const CERTIFICATE: &str = "arn:aws:acm:us-east-1:123456789012:certificate/abc";

    fn properties<'a>(
        template: &'a Template,
        logical_id: &str,
    ) -> &'a serde_json::Map<String, serde_json::Value> {
        &template.resources[logical_id].properties
    }

    #[test]
    fn default_stack_end_to_end() {
        let template = synth_config(&StackConfig::default()).unwrap();

        assert_eq!(template.count_of_type("AWS::ElasticLoadBalancingV2::LoadBalancer"), 1);
        assert_eq!(template.count_of_type("AWS::ElasticLoadBalancingV2::Listener"), 1);
        assert_eq!(template.count_of_type("AWS::ElasticLoadBalancingV2::TargetGroup"), 1);
        assert_eq!(template.count_of_type("AWS::AutoScaling::AutoScalingGroup"), 1);
        assert_eq!(template.count_of_type("AWS::EC2::NatGateway"), 0);

        let listener = properties(&template, "StreamlineLoadBalancerListener80");
        assert_eq!(listener["Port"], 80);
        assert_eq!(listener["Protocol"], "HTTP");

        let asg = properties(&template, "StreamlineAutoScalingGroup");
        assert_eq!(asg["MinSize"], "2");
        assert_eq!(asg["MaxSize"], "4");
        assert_eq!(asg["DesiredCapacity"], "2");
        assert_eq!(
            asg["TargetGroupARNs"],
            serde_json::json!([{ "Ref": "StreamlineTargetGroup" }])
        );

        let public_subnets: Vec<_> = template
            .resources_of_type("AWS::EC2::Subnet")
            .filter(|(_, r)| {
                r.properties["Tags"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .any(|t| t["Key"] == "streamline:subnet-type" && t["Value"] == "Public")
            })
            .collect();
        assert_eq!(public_subnets.len(), 2);

        assert_eq!(
            template.outputs[DNS_NAME_OUTPUT].value,
            serde_json::json!({ "Fn::GetAtt": ["StreamlineLoadBalancer", "DNSName"] })
        );
        assert_eq!(
            template.parameters[MACHINE_IMAGE_PARAMETER].default.as_deref(),
            Some(crate::compute::AMAZON_LINUX_2_PARAMETER)
        );
    }

    #[test]
    fn synthesis_is_deterministic() {
        let config = StackConfig::preset("streamline").unwrap();
        let first = synth_config(&config).unwrap().to_json_string().unwrap();
        let second = synth_config(&config).unwrap().to_json_string().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn capacity_violation_produces_no_template() {
        let mut config = StackConfig::default();
        config.instances.capacity.desired = 5;
        config.instances.capacity.max = 4;
        assert!(matches!(
            synth_config(&config),
            Err(StackError::CapacityBounds {
                min: 2,
                desired: 5,
                max: 4
            })
        ));
    }

    #[test]
    fn target_port_outside_instance_ingress_fails_the_check() {
        let mut config = StackConfig::default();
        config.load_balancer.target_port = 443;
        let stack = build_stack(&config).unwrap();

        let errors: Vec<_> = stack.check().into_iter().filter(|d| d.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].subject, "StreamlineAutoScalingGroup");
        assert!(matches!(stack.synth(), Err(StackError::Check(_))));
    }

    #[test]
    fn https_port_without_certificate_is_opened_but_not_listened_on() {
        let stack = build_stack(&StackConfig::preset("streamline").unwrap()).unwrap();
        assert!(stack.load_balancer.listener_on(443).is_none());
        assert!(stack.load_balancer_group.allows_from_anywhere(443));

        let diagnostics = stack.check();
        assert!(diagnostics.iter().all(|d| !d.is_error()));
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("port 443 is open to the internet"))
        );
        assert!(stack.synth().is_ok());
    }

    #[test]
    fn certificate_enables_https_and_redirect() {
        let mut config = StackConfig::preset("streamline").unwrap();
        config.exposure.certificate_arn = Some(CERTIFICATE.to_string());
        config.exposure.redirect_http = true;

        let template = synth_config(&config).unwrap();
        let https = properties(&template, "StreamlineLoadBalancerListener443");
        assert_eq!(https["Protocol"], "HTTPS");
        assert_eq!(https["Certificates"][0]["CertificateArn"], CERTIFICATE);

        let http = properties(&template, "StreamlineLoadBalancerListener80");
        assert_eq!(http["DefaultActions"][0]["Type"], "redirect");
    }

    #[test]
    fn redirect_without_https_port_fails_the_check() {
        let mut config = StackConfig::default();
        config.exposure.ports = vec![80];
        config.exposure.certificate_arn = Some(CERTIFICATE.to_string());
        config.exposure.redirect_http = true;
        let stack = build_stack(&config).unwrap();

        let errors: Vec<_> = stack.check().into_iter().filter(|d| d.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].subject, "StreamlineLoadBalancerListener80");
        assert!(matches!(stack.synth(), Err(StackError::Check(_))));
    }

    #[test]
    fn redirect_without_certificate_is_rejected() {
        let mut config = StackConfig::default();
        config.exposure.redirect_http = true;
        assert!(matches!(
            build_stack(&config),
            Err(StackError::MissingCertificate { port: 443 })
        ));
    }

    #[test]
    fn private_placement_requires_private_subnets() {
        let mut config = StackConfig::default();
        config.instances.placement = SubnetType::Private;
        assert!(matches!(
            build_stack(&config),
            Err(StackError::Placement { .. })
        ));
    }

    #[test]
    fn presets_reproduce_variant_differences() {
        for name in PRESETS {
            assert!(build_stack(&StackConfig::preset(name).unwrap()).is_ok(), "{}", name);
        }

        let alb = build_stack(&StackConfig::preset("alb").unwrap()).unwrap();
        assert!(alb.instance_group.allows_from_group(&alb.load_balancer_group.logical_id, 443));
        assert!(alb.boot_report.uses_tmux);

        let streamline = build_stack(&StackConfig::preset("streamline").unwrap()).unwrap();
        assert!(streamline.instance_group.allows_from_anywhere(22));
        assert_eq!(streamline.load_balancer.name.as_deref(), Some("streamline-alb"));

        let private = StackConfig::preset("private").unwrap();
        assert_eq!(private.network.subnet_layout, SubnetLayout::PrivateWithNat);
        let template = synth_config(&private).unwrap();
        assert_eq!(template.count_of_type("AWS::EC2::NatGateway"), 1);
        assert_eq!(
            properties(&template, "StreamlineAutoScalingGroup")["VPCZoneIdentifier"],
            serde_json::json!([
                { "Ref": "StreamlinePrivateSubnet1" },
                { "Ref": "StreamlinePrivateSubnet2" }
            ])
        );
        assert_eq!(
            properties(&template, "StreamlineAutoScalingGroupLaunchTemplate")
                ["LaunchTemplateData"]["KeyName"],
            "streamline"
        );

        let fleet = synth_config(&StackConfig::preset("fleet").unwrap()).unwrap();
        let asg = properties(&fleet, "StreamlineAutoScalingGroup");
        assert_eq!(asg["MinSize"], "4");
        assert_eq!(asg["MaxSize"], "4");
        let data = &properties(&fleet, "StreamlineAutoScalingGroupLaunchTemplate")
            ["LaunchTemplateData"];
        assert_eq!(data["KeyName"], "streamline.pem");
        assert_eq!(
            data["BlockDeviceMappings"],
            serde_json::json!([{
                "DeviceName": "/dev/sda1",
                "Ebs": { "DeleteOnTermination": true, "VolumeSize": 10, "VolumeType": "gp2" }
            }])
        );
    }

    #[test]
    fn generated_boot_script_is_embedded() {
        let stack = build_stack(&StackConfig::default()).unwrap();
        assert_eq!(stack.boot_report.redirects.len(), 1);
        assert_eq!(stack.boot_report.launches.len(), 1);
        assert_eq!(stack.pool.user_data(), Some(stack.boot_script.as_str()));

        let template = stack.synth().unwrap();
        let data = &properties(&template, "StreamlineAutoScalingGroupLaunchTemplate")
            ["LaunchTemplateData"];
        assert!(data["UserData"]["Fn::Base64"].as_str().unwrap().contains("set -euo pipefail"));
    }

    #[test]
    fn user_data_file_is_embedded_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_data.sh");
        std::fs::write(&path, "#!/bin/bash\necho custom\n").unwrap();

        let mut config = StackConfig::default();
        config.instances.user_data_file = Some(path);
        let stack = build_stack(&config).unwrap();
        assert_eq!(stack.boot_script, "#!/bin/bash\necho custom\n");
        assert!(stack.boot_report.redirects.is_empty());
        assert!(
            stack
                .check()
                .iter()
                .any(|d| d.message.contains("expected one port redirect"))
        );
    }

    #[test]
    fn missing_user_data_file_is_an_io_error() {
        let mut config = StackConfig::default();
        config.instances.user_data_file = Some("/nonexistent/user_data.sh".into());
        assert!(matches!(build_stack(&config), Err(StackError::Io { .. })));
    }

    #[test]
    fn scaling_policy_and_literal_ami() {
        let mut config = StackConfig::default();
        config.instances.machine_image = "ami-0123456789abcdef0".to_string();
        config.instances.scaling = Some(ScalingConfig {
            metric: ScalingMetric::CpuUtilization,
            target_value: 60,
            warmup_seconds: 120,
        });
        config.application.supervision = Supervision::Systemd;

        let stack = build_stack(&config).unwrap();
        assert!(
            !stack
                .check()
                .iter()
                .any(|d| d.message.contains("no scaling policy"))
        );

        let template = stack.synth().unwrap();
        assert!(template.parameters.is_empty());
        assert_eq!(template.count_of_type("AWS::AutoScaling::ScalingPolicy"), 1);
        assert_eq!(
            properties(&template, "StreamlineAutoScalingGroupLaunchTemplate")
                ["LaunchTemplateData"]["ImageId"],
            "ami-0123456789abcdef0"
        );
    }

    #[test]
    fn invalid_stack_name() {
        let config = StackConfig {
            stack_name: "--".to_string(),
            ..StackConfig::default()
        };
        assert!(matches!(
            build_stack(&config),
            Err(StackError::InvalidStackName(_))
        ));
    }
}
