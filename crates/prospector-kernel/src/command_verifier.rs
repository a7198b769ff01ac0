//! [`CommandVerifier`] – output-boundary interlock for actuator commands.
//!
//! Every [`ActuatorCommand`] the controller produces is passed through
//! [`CommandVerifier::verify`] before it leaves the core. Registered
//! [`Rule`]s are evaluated in order; the first violation returns
//! [`ProspectorError::CommandRejected`] and the command must not be sent.
//!
//! Built-in rules:
//! - [`FiniteRule`] – every field is a finite number.
//! - [`SteerLimitRule`] – `|steer|` within the steering range.
//! - [`ThrottleRangeRule`] – throttle inside `[min, max]`.
//! - [`BrakeRule`] – brake is non-negative.

use prospector_types::{ActuatorCommand, ProspectorError};
use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single invariant that an outgoing command must satisfy.
pub trait Rule: Send + Sync {
    /// Human-readable name used in rejection messages.
    fn name(&self) -> &str;

    /// `Ok(())` when `cmd` satisfies the invariant.
    fn check(&self, cmd: &ActuatorCommand) -> Result<(), ProspectorError>;
}

fn reject(rule: &dyn Rule, details: String) -> Result<(), ProspectorError> {
    Err(ProspectorError::CommandRejected {
        rule: rule.name().to_string(),
        details,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// CommandVerifier
// ────────────────────────────────────────────────────────────────────────────

/// Rule engine applied to every outgoing [`ActuatorCommand`].
///
/// # Example
///
/// ```
/// use prospector_kernel::command_verifier::{CommandVerifier, SteerLimitRule};
/// use prospector_types::ActuatorCommand;
///
/// let mut verifier = CommandVerifier::new();
/// verifier.add_rule(Box::new(SteerLimitRule { max_deg: 15.0 }));
///
/// let ok = ActuatorCommand { steer: 10.0, ..ActuatorCommand::idle() };
/// assert!(verifier.verify(&ok).is_ok());
///
/// let too_far = ActuatorCommand { steer: -20.0, ..ActuatorCommand::idle() };
/// assert!(verifier.verify(&too_far).is_err());
/// ```
#[derive(Default)]
pub struct CommandVerifier {
    rules: Vec<Box<dyn Rule>>,
}

impl CommandVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifier with the four built-in rules: finite values, steering within
    /// `±max_steer_deg`, throttle in `[-1, 1]`, non-negative brake.
    pub fn with_default_rules(max_steer_deg: f32) -> Self {
        let mut v = Self::new();
        v.add_rule(Box::new(FiniteRule));
        v.add_rule(Box::new(SteerLimitRule {
            max_deg: max_steer_deg,
        }));
        v.add_rule(Box::new(ThrottleRangeRule {
            min: -1.0,
            max: 1.0,
        }));
        v.add_rule(Box::new(BrakeRule));
        v
    }

    /// Register a rule. Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Validate `cmd` against every rule, returning the first rejection.
    pub fn verify(&self, cmd: &ActuatorCommand) -> Result<(), ProspectorError> {
        for rule in &self.rules {
            if let Err(e) = rule.check(cmd) {
                debug!(rule = rule.name(), ?cmd, "command failed verification");
                return Err(e);
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

/// Rejects NaN or infinite throttle, brake or steer.
pub struct FiniteRule;

impl Rule for FiniteRule {
    fn name(&self) -> &str {
        "finite"
    }

    fn check(&self, cmd: &ActuatorCommand) -> Result<(), ProspectorError> {
        for (field, v) in [
            ("throttle", cmd.throttle),
            ("brake", cmd.brake),
            ("steer", cmd.steer),
        ] {
            if !v.is_finite() {
                return reject(self, format!("{field} is {v}"));
            }
        }
        Ok(())
    }
}

/// Rejects steering angles beyond `±max_deg`.
pub struct SteerLimitRule {
    pub max_deg: f32,
}

impl Rule for SteerLimitRule {
    fn name(&self) -> &str {
        "steer_limit"
    }

    fn check(&self, cmd: &ActuatorCommand) -> Result<(), ProspectorError> {
        if cmd.steer.abs() > self.max_deg {
            return reject(
                self,
                format!("steer {} exceeds ±{}", cmd.steer, self.max_deg),
            );
        }
        Ok(())
    }
}

/// Rejects throttle outside `[min, max]` (inclusive).
pub struct ThrottleRangeRule {
    pub min: f32,
    pub max: f32,
}

impl Rule for ThrottleRangeRule {
    fn name(&self) -> &str {
        "throttle_range"
    }

    fn check(&self, cmd: &ActuatorCommand) -> Result<(), ProspectorError> {
        if cmd.throttle < self.min || cmd.throttle > self.max {
            return reject(
                self,
                format!(
                    "throttle {} out of [{}, {}]",
                    cmd.throttle, self.min, self.max
                ),
            );
        }
        Ok(())
    }
}

/// Rejects negative brake values.
pub struct BrakeRule;

impl Rule for BrakeRule {
    fn name(&self) -> &str {
        "brake"
    }

    fn check(&self, cmd: &ActuatorCommand) -> Result<(), ProspectorError> {
        if cmd.brake < 0.0 {
            return reject(self, format!("brake {} is negative", cmd.brake));
        }
        Ok(())
    }
}
