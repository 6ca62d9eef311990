//! Boot script - Ordered provisioning steps run once by every instance
//!
//! The script is embedded as user data. A failing step aborts the rest
//! (`set -euo pipefail`); the failure only becomes visible through the
//! target group health check.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{ApplicationConfig, Supervision};

static REDIRECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--dport\s+(\d+)\s+-j\s+REDIRECT\s+--to-ports?\s+(\d+)")
        .expect("redirect pattern is valid")
});

static TMUX_LAUNCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:sudo\s+)?tmux\s+send-keys\b.*?"([^"]+)""#)
        .expect("tmux launch pattern is valid")
});

static SERVICE_LAUNCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^ExecStart=(.+)$").expect("service launch pattern is valid")
});

const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";

/// One provisioning step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootStep {
    UpdatePackages,
    InstallPackages(Vec<String>),
    InstallRuntime(String),
    /// Clone unless the directory already exists
    CloneSource { repository: String, directory: String },
    RedirectPort { from: u16, to: u16 },
    /// Write a systemd unit and reload the manager
    InstallService { name: String, unit: String },
    /// Enable at boot and start now
    StartService { name: String },
    StartSession { name: String, directory: String },
    SendKeys { session: String, command: String },
}

impl fmt::Display for BootStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootStep::UpdatePackages => writeln!(f, "yum update -y"),
            BootStep::InstallPackages(packages) => {
                writeln!(f, "yum install -y {}", packages.join(" "))
            }
            BootStep::InstallRuntime(package) => writeln!(f, "pip3 install {}", package),
            BootStep::CloneSource {
                repository,
                directory,
            } => writeln!(
                f,
                "[ -d {dir} ] || git clone {repo} {dir}",
                dir = directory,
                repo = repository
            ),
            BootStep::RedirectPort { from, to } => writeln!(
                f,
                "iptables -t nat -A PREROUTING -p tcp --dport {} -j REDIRECT --to-port {}",
                from, to
            ),
            BootStep::InstallService { name, unit } => {
                writeln!(f, "cat > {}/{}.service <<'UNIT'", SYSTEMD_UNIT_DIR, name)?;
                write!(f, "{}", unit)?;
                writeln!(f, "UNIT")?;
                writeln!(f, "systemctl daemon-reload")
            }
            BootStep::StartService { name } => {
                writeln!(f, "systemctl enable --now {}.service", name)
            }
            BootStep::StartSession { name, directory } => {
                writeln!(f, "tmux new-session -d -s {} -c {}", name, directory)
            }
            BootStep::SendKeys { session, command } => {
                writeln!(f, "tmux send-keys -t {} \"{}\" C-m", session, command)
            }
        }
    }
}

/// Port redirect found in a script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRedirect {
    pub from: u16,
    pub to: u16,
}

/// What a boot script does, as far as it can be read from its text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub redirects: Vec<PortRedirect>,
    /// Commands launched under supervision
    pub launches: Vec<String>,
    pub uses_tmux: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootScript {
    steps: Vec<BootStep>,
}

impl BootScript {
    /// Steps provisioning the application described by `app`
    pub fn for_application(app: &ApplicationConfig) -> Self {
        let prerequisites = match app.supervision {
            Supervision::Systemd => ["git", "python3-pip"],
            Supervision::Tmux => ["git", "tmux"],
        };

        let mut steps = vec![
            BootStep::UpdatePackages,
            BootStep::InstallPackages(prerequisites.iter().map(|p| p.to_string()).collect()),
            BootStep::InstallRuntime(app.runtime_package.clone()),
            BootStep::CloneSource {
                repository: app.repository.clone(),
                directory: app.install_dir.clone(),
            },
            BootStep::RedirectPort {
                from: app.public_port,
                to: app.app_port,
            },
        ];

        match app.supervision {
            Supervision::Systemd => {
                steps.push(BootStep::InstallService {
                    name: app.service_name.clone(),
                    unit: service_unit(app),
                });
                steps.push(BootStep::StartService {
                    name: app.service_name.clone(),
                });
            }
            Supervision::Tmux => {
                let session = format!("{}_session", app.service_name);
                steps.push(BootStep::StartSession {
                    name: session.clone(),
                    directory: app.working_dir(),
                });
                steps.push(BootStep::SendKeys {
                    session,
                    command: app.launch_command(),
                });
            }
        }

        Self { steps }
    }

    pub fn steps(&self) -> &[BootStep] {
        &self.steps
    }

    pub fn render(&self) -> String {
        let mut out = String::from("#!/bin/bash\nset -euo pipefail\n");
        for step in &self.steps {
            out.push_str(&step.to_string());
        }
        out
    }

    /// Report the port redirects and supervised launches of any script
    pub fn inspect(script: &str) -> ScriptReport {
        let redirects = REDIRECT
            .captures_iter(script)
            .filter_map(|c| {
                Some(PortRedirect {
                    from: c[1].parse().ok()?,
                    to: c[2].parse().ok()?,
                })
            })
            .collect();

        let launches = TMUX_LAUNCH
            .captures_iter(script)
            .chain(SERVICE_LAUNCH.captures_iter(script))
            .map(|c| c[1].trim().to_string())
            .collect();

        ScriptReport {
            redirects,
            launches,
            uses_tmux: TMUX_LAUNCH.is_match(script),
        }
    }
}

fn service_unit(app: &ApplicationConfig) -> String {
    format!(
        "[Unit]\n\
         Description={name} application\n\
         After=network.target\n\
         \n\
         [Service]\n\
         WorkingDirectory={dir}\n\
         ExecStart=/usr/bin/env {command}\n\
         Restart=always\n\
         User={user}\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        name = app.service_name,
        dir = app.working_dir(),
        command = app.launch_command(),
        user = app.run_as,
    )
}
