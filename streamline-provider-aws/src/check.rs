//! Consistency checks over a declared stack
//!
//! Errors block synthesis; warnings are reported and synthesis continues.

use std::fmt;

use crate::access::AccessGroup;
use crate::boot_script::ScriptReport;
use crate::builder::StreamlineStack;
use crate::compute::ScalablePool;
use crate::load_balancer::{DefaultAction, LoadBalancer};
use crate::network::NetworkBoundary;

const SSH_PORT: u16 = 22;
const HTTPS_PORT: u16 = 443;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A consistency finding about one declared component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Logical ID of the component the finding is about
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn error(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, subject, message)
    }

    pub fn warning(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, subject, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.subject, self.message)
    }
}

/// Run every check, errors first
pub fn check(stack: &StreamlineStack) -> Vec<Diagnostic> {
    let groups = [&stack.load_balancer_group, &stack.instance_group];
    let pools = [&stack.pool];

    let mut diagnostics = Vec::new();
    check_reachability(&stack.load_balancer, &groups, &pools, &mut diagnostics);
    check_placement(&stack.network, &pools, &mut diagnostics);
    check_exposure(&stack.load_balancer, &stack.load_balancer_group, &mut diagnostics);
    check_admin_access(&stack.instance_group, &mut diagnostics);
    check_scaling(&pools, &mut diagnostics);
    check_boot_script(&stack.load_balancer, &stack.boot_report, &mut diagnostics);

    diagnostics.sort_by_key(|d| d.severity);
    diagnostics
}

/// Every listener must reach the pools behind its target groups on the target port
pub fn check_reachability(
    lb: &LoadBalancer,
    groups: &[&AccessGroup],
    pools: &[&ScalablePool],
    diagnostics: &mut Vec<Diagnostic>,
) {
    let lb_group = groups.iter().find(|g| g.logical_id == lb.access_group);

    for listener in lb.listeners() {
        if let DefaultAction::RedirectToHttps(port) = listener.action {
            if lb.listener_on(port).is_none() {
                diagnostics.push(Diagnostic::error(
                    &listener.logical_id,
                    format!(
                        "redirects port {} to port {}, which has no listener",
                        listener.port, port
                    ),
                ));
            } else if !lb_group.is_some_and(|g| g.allows_from_anywhere(port)) {
                diagnostics.push(Diagnostic::error(
                    &listener.logical_id,
                    format!(
                        "redirects port {} to port {}, which {} does not open",
                        listener.port, port, lb.access_group
                    ),
                ));
            }
            continue;
        }

        if listener.action == DefaultAction::Forward(Vec::new()) {
            diagnostics.push(Diagnostic::warning(
                &listener.logical_id,
                format!(
                    "listener on port {} has no target groups and answers 503",
                    listener.port
                ),
            ));
            continue;
        }

        for target_id in listener.target_groups() {
            let Some(target) = lb.target_group(target_id) else {
                diagnostics.push(Diagnostic::error(
                    &listener.logical_id,
                    format!("forwards to undeclared target group {}", target_id),
                ));
                continue;
            };

            let members: Vec<&&ScalablePool> = pools
                .iter()
                .filter(|p| p.is_registered_with(target_id))
                .collect();
            if members.is_empty() {
                diagnostics.push(Diagnostic::warning(
                    target_id,
                    format!(
                        "no pool is registered; listener on port {} has no healthy targets",
                        listener.port
                    ),
                ));
            }

            for pool in members {
                let group = pool
                    .access_group
                    .as_deref()
                    .and_then(|id| groups.iter().find(|g| g.logical_id == id));
                let reachable =
                    group.is_some_and(|g| g.allows_from_group(&lb.access_group, target.port));
                if !reachable {
                    diagnostics.push(Diagnostic::error(
                        &pool.logical_id,
                        format!(
                            "instances do not allow {} on port {}; listener on port {} cannot reach target group {}",
                            lb.access_group, target.port, listener.port, target_id
                        ),
                    ));
                }
            }
        }
    }
}

/// Pools may only be placed in subnets their network declares
pub fn check_placement(
    network: &NetworkBoundary,
    pools: &[&ScalablePool],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for pool in pools {
        if pool.network != network.logical_id {
            diagnostics.push(Diagnostic::error(
                &pool.logical_id,
                format!("placed in network {}, expected {}", pool.network, network.logical_id),
            ));
        }
        for subnet in pool.subnet_ids() {
            if !network.declares_subnet(subnet) {
                diagnostics.push(Diagnostic::error(
                    &pool.logical_id,
                    format!("placement names undeclared subnet {}", subnet),
                ));
            }
        }
    }
}

/// Ports opened on the load balancer should have a listener
pub fn check_exposure(lb: &LoadBalancer, group: &AccessGroup, diagnostics: &mut Vec<Diagnostic>) {
    for range in group.open_ports() {
        if lb.listeners().iter().any(|l| range.contains(l.port)) {
            continue;
        }
        let hint = if range.contains(HTTPS_PORT) {
            "; set exposure.certificate_arn to serve HTTPS"
        } else {
            ""
        };
        diagnostics.push(Diagnostic::warning(
            &lb.logical_id,
            format!(
                "port {} is open to the internet but has no listener{}",
                range, hint
            ),
        ));
    }
}

pub fn check_admin_access(group: &AccessGroup, diagnostics: &mut Vec<Diagnostic>) {
    if group.allows_from_anywhere(SSH_PORT) {
        diagnostics.push(Diagnostic::warning(
            &group.logical_id,
            "SSH is open to 0.0.0.0/0; prefer Systems Manager sessions or a narrower admin_cidr",
        ));
    }
}

pub fn check_scaling(pools: &[&ScalablePool], diagnostics: &mut Vec<Diagnostic>) {
    for pool in pools {
        if pool.scaling().is_none() {
            diagnostics.push(Diagnostic::warning(
                &pool.logical_id,
                format!(
                    "no scaling policy; capacity stays at {} instances",
                    pool.capacity.desired()
                ),
            ));
        }
    }
}

/// The boot script should redirect the target port once and launch the application once
pub fn check_boot_script(
    lb: &LoadBalancer,
    report: &ScriptReport,
    diagnostics: &mut Vec<Diagnostic>,
) {
    const SUBJECT: &str = "BootScript";

    if report.redirects.len() != 1 {
        diagnostics.push(Diagnostic::warning(
            SUBJECT,
            format!("expected one port redirect, found {}", report.redirects.len()),
        ));
    }
    if report.launches.len() != 1 {
        diagnostics.push(Diagnostic::warning(
            SUBJECT,
            format!("expected one application launch, found {}", report.launches.len()),
        ));
    }
    for target in lb.target_groups() {
        if !report.redirects.is_empty() && !report.redirects.iter().any(|r| r.from == target.port) {
            diagnostics.push(Diagnostic::warning(
                SUBJECT,
                format!(
                    "target group {} sends traffic to port {}, which the script does not redirect",
                    target.logical_id, target.port
                ),
            ));
        }
    }
    if report.uses_tmux {
        diagnostics.push(Diagnostic::warning(
            SUBJECT,
            "application runs in a tmux session and is not restarted after a crash or reboot",
        ));
    }
}
