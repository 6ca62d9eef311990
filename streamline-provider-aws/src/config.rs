//! Configuration - The explicit object a stack is built from
//!
//! Configurations are read from YAML (`.yaml`/`.yml`) or JSON (`.json`)
//! files. Every field has a default, so an empty file describes the
//! default stack.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StackError;

/// Names accepted by [`StackConfig::preset`]
pub const PRESETS: &[&str] = &["alb", "streamline", "private", "fleet"];

/// Default configuration file name looked up by the CLI
pub const DEFAULT_CONFIG_FILE: &str = "streamline.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    /// Stack name; logical IDs are prefixed with its PascalCase form
    pub stack_name: String,
    pub description: Option<String>,
    pub network: NetworkConfig,
    pub exposure: ExposureConfig,
    pub load_balancer: LoadBalancerConfig,
    pub instances: InstanceConfig,
    pub application: ApplicationConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: "streamline".to_string(),
            description: Some("Streamline dashboard behind an Application Load Balancer".to_string()),
            network: NetworkConfig::default(),
            exposure: ExposureConfig::default(),
            load_balancer: LoadBalancerConfig::default(),
            instances: InstanceConfig::default(),
            application: ApplicationConfig::default(),
        }
    }
}

/// Which subnets the network declares in every zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetLayout {
    /// Public subnets only
    Public,
    /// Public subnets plus private subnets routed through NAT gateways
    PrivateWithNat,
}

/// Kind of a declared subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetType {
    Public,
    Private,
}

impl fmt::Display for SubnetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetType::Public => write!(f, "Public"),
            SubnetType::Private => write!(f, "Private"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub cidr: String,
    pub max_azs: usize,
    /// Prefix length of every carved subnet
    pub cidr_mask: u8,
    pub subnet_layout: SubnetLayout,
    /// Defaults to one per zone for `private_with_nat`, none otherwise
    pub nat_gateways: Option<usize>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_string(),
            max_azs: 2,
            cidr_mask: 24,
            subnet_layout: SubnetLayout::Public,
            nat_gateways: None,
        }
    }
}

impl NetworkConfig {
    pub fn nat_gateway_count(&self) -> usize {
        match (self.nat_gateways, self.subnet_layout) {
            (Some(count), _) => count,
            (None, SubnetLayout::PrivateWithNat) => self.max_azs,
            (None, SubnetLayout::Public) => 0,
        }
    }
}

/// Inclusive TCP port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortRange {
    pub from: u16,
    pub to: u16,
}

impl PortRange {
    pub fn new(from: u16, to: u16) -> Self {
        Self { from, to }
    }

    pub fn single(port: u16) -> Self {
        Self { from: port, to: port }
    }

    pub fn contains(&self, port: u16) -> bool {
        self.from <= port && port <= self.to
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// Ports opened to the internet on the load balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExposureConfig {
    pub ports: Vec<u16>,
    /// Open port 22 on the instances
    pub admin_ssh: bool,
    pub admin_cidr: String,
    /// Certificate for the HTTPS listener on port 443
    pub certificate_arn: Option<String>,
    /// Redirect plain HTTP to HTTPS (requires a certificate)
    pub redirect_http: bool,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            ports: vec![80],
            admin_ssh: false,
            admin_cidr: "0.0.0.0/0".to_string(),
            certificate_arn: None,
            redirect_http: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthCheckConfig {
    pub path: String,
    pub interval_seconds: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
    pub matcher: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            interval_seconds: 30,
            healthy_threshold: 5,
            unhealthy_threshold: 2,
            matcher: "200".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadBalancerConfig {
    /// Physical name; generated at deploy time when omitted
    pub name: Option<String>,
    pub internet_facing: bool,
    /// Port the target group forwards to on every instance
    pub target_port: u16,
    pub health_check: HealthCheckConfig,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            name: None,
            internet_facing: true,
            target_port: 80,
            health_check: HealthCheckConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapacityConfig {
    pub min: u32,
    pub desired: u32,
    pub max: u32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            min: 2,
            desired: 2,
            max: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockDeviceConfig {
    pub device_name: String,
    pub volume_size_gib: u32,
    pub volume_type: String,
    pub delete_on_termination: bool,
}

impl Default for BlockDeviceConfig {
    fn default() -> Self {
        Self {
            device_name: "/dev/xvda".to_string(),
            volume_size_gib: 8,
            volume_type: "gp2".to_string(),
            delete_on_termination: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMetric {
    CpuUtilization,
    RequestCountPerTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalingConfig {
    pub metric: ScalingMetric,
    pub target_value: u32,
    #[serde(default = "default_warmup")]
    pub warmup_seconds: u32,
}

fn default_warmup() -> u32 {
    300
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceConfig {
    pub instance_type: String,
    /// `amazon-linux-2`, `amazon-linux` or a literal `ami-...` ID
    pub machine_image: String,
    pub key_name: Option<String>,
    pub placement: SubnetType,
    pub capacity: CapacityConfig,
    pub block_devices: Vec<BlockDeviceConfig>,
    pub scaling: Option<ScalingConfig>,
    pub grace_period_seconds: u32,
    /// Port ranges the load balancer may reach on the instances
    pub ingress_from_load_balancer: Vec<PortRange>,
    /// Boot script embedded verbatim instead of the generated one
    pub user_data_file: Option<PathBuf>,
    /// Attach the SSM managed-instance policy to the instance role
    pub ssm_access: bool,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            instance_type: "t2.micro".to_string(),
            machine_image: "amazon-linux-2".to_string(),
            key_name: None,
            placement: SubnetType::Public,
            capacity: CapacityConfig::default(),
            block_devices: Vec::new(),
            scaling: None,
            grace_period_seconds: 300,
            ingress_from_load_balancer: vec![PortRange::single(80)],
            user_data_file: None,
            ssm_access: true,
        }
    }
}

/// How the application process is kept running on each instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Supervision {
    /// systemd unit restarted on failure and enabled at boot
    Systemd,
    /// Detached tmux session; not restarted on failure or reboot
    Tmux,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplicationConfig {
    pub repository: String,
    pub install_dir: String,
    /// Directory inside the checkout the application runs from
    pub working_subdir: String,
    /// Python package providing the application server
    pub runtime_package: String,
    pub entry_point: String,
    /// Port the load balancer reaches; redirected to `app_port`
    pub public_port: u16,
    pub app_port: u16,
    pub supervision: Supervision,
    pub service_name: String,
    pub run_as: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            repository: "https://github.com/jakeoliverlee/Streamline.git".to_string(),
            install_dir: "/opt/streamline".to_string(),
            working_subdir: "app".to_string(),
            runtime_package: "streamlit".to_string(),
            entry_point: "Home.py".to_string(),
            public_port: 80,
            app_port: 8080,
            supervision: Supervision::Systemd,
            service_name: "streamline".to_string(),
            run_as: "ec2-user".to_string(),
        }
    }
}

impl ApplicationConfig {
    /// Directory the launch command runs in
    pub fn working_dir(&self) -> String {
        if self.working_subdir.is_empty() {
            self.install_dir.clone()
        } else {
            format!(
                "{}/{}",
                self.install_dir.trim_end_matches('/'),
                self.working_subdir
            )
        }
    }

    pub fn launch_command(&self) -> String {
        format!(
            "{} run --server.port {} {}",
            self.runtime_package, self.app_port, self.entry_point
        )
    }
}

impl StackConfig {
    /// Load a configuration file, choosing the format by extension
    ///
    /// A relative `user_data_file` is resolved against the directory of
    /// the configuration file.
    pub fn load(path: &Path) -> Result<Self, StackError> {
        let content = std::fs::read_to_string(path).map_err(|source| StackError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_yaml_str(&content)?,
        };

        if let Some(file) = &config.instances.user_data_file
            && file.is_relative()
            && let Some(dir) = path.parent()
        {
            config.instances.user_data_file = Some(dir.join(file));
        }

        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, StackError> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, StackError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, StackError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Configuration reproducing one of the known stack variants
    ///
    /// - `alb`: public subnets, HTTP only, instances open to the load
    ///   balancer on 80-443, legacy tmux supervision
    /// - `streamline`: public subnets, ports 80 and 443 exposed, admin SSH,
    ///   named load balancer
    /// - `private`: instances in private subnets behind one NAT gateway,
    ///   fixed capacity of two, key pair access
    /// - `fleet`: fixed fleet of four in public subnets with a 10 GiB root
    ///   volume on `/dev/sda1`
    pub fn preset(name: &str) -> Result<Self, StackError> {
        let mut config = Self::default();
        match name {
            "alb" => {
                config.instances.ingress_from_load_balancer = vec![PortRange::new(80, 443)];
                config.application.supervision = Supervision::Tmux;
            }
            "streamline" => {
                config.exposure.ports = vec![80, 443];
                config.exposure.admin_ssh = true;
                config.load_balancer.name = Some("streamline-alb".to_string());
            }
            "private" => {
                config.network.subnet_layout = SubnetLayout::PrivateWithNat;
                config.network.nat_gateways = Some(1);
                config.instances.placement = SubnetType::Private;
                config.instances.machine_image = "amazon-linux".to_string();
                config.instances.key_name = Some("streamline".to_string());
                config.instances.capacity = CapacityConfig {
                    min: 2,
                    desired: 2,
                    max: 2,
                };
            }
            "fleet" => {
                config.instances.key_name = Some("streamline.pem".to_string());
                config.instances.capacity = CapacityConfig {
                    min: 4,
                    desired: 4,
                    max: 4,
                };
                config.instances.block_devices = vec![BlockDeviceConfig {
                    device_name: "/dev/sda1".to_string(),
                    volume_size_gib: 10,
                    volume_type: "gp2".to_string(),
                    ..BlockDeviceConfig::default()
                }];
            }
            other => return Err(StackError::UnknownPreset(other.to_string())),
        }
        Ok(config)
    }
}
