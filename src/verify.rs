//! Call-count verification.
//!
//! Verification is explicit: nothing here runs until a test asks for it.

use crate::config::{RegistrySettings, Times};
use crate::error::{MockError, MockResult};
use crate::expectation::Expectation;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// An expectation whose invocation count does not satisfy its policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub client: String,
    /// `METHOD uri`, prefixed with the expectation name when it has one
    pub expectation: String,
    /// Configured body, rendered for diagnostics
    pub body: String,
    pub policy: Times,
    pub calls: u32,
}

impl Violation {
    fn new(client: &str, expectation: &Expectation, settings: &RegistrySettings) -> Self {
        Self {
            client: client.to_string(),
            expectation: expectation.describe(),
            body: settings.render_body(expectation.matcher().body_description()),
            policy: expectation.times(),
            calls: expectation.calls(),
        }
    }

    pub fn into_error(self) -> MockError {
        MockError::Verification {
            client: self.client,
            expectation: self.expectation,
            body: self.body,
            policy: self.policy,
            calls: self.calls,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} should be called {} but was called {} time(s); body: {}",
            self.client, self.expectation, self.policy, self.calls, self.body
        )
    }
}

/// Check one expectation's counter against its policy.
pub fn check(
    client: &str,
    expectation: &Expectation,
    settings: &RegistrySettings,
) -> Option<Violation> {
    if expectation.times().is_satisfied(expectation.calls()) {
        None
    } else {
        Some(Violation::new(client, expectation, settings))
    }
}

/// Verify a single expectation.
///
/// Fails with [`MockError::NotComplete`] when no response was ever configured,
/// before looking at the counter.
pub fn verify_expectation(
    client: &str,
    expectation: &Expectation,
    settings: &RegistrySettings,
) -> MockResult<()> {
    if !expectation.is_complete() {
        return Err(MockError::NotComplete {
            client: client.to_string(),
            expectation: expectation.describe(),
            body: settings.render_body(expectation.matcher().body_description()),
        });
    }
    match check(client, expectation, settings) {
        Some(violation) => Err(violation.into_error()),
        None => Ok(()),
    }
}

/// Verify every expectation in order, stopping at the first violation.
pub fn verify_all<'a, I>(clients: I, settings: &RegistrySettings) -> MockResult<()>
where
    I: IntoIterator<Item = (&'a str, &'a [Arc<Expectation>])>,
{
    for (client, expectations) in clients {
        for expectation in expectations {
            if let Some(violation) = check(client, expectation, settings) {
                warn!(
                    client = %violation.client,
                    expectation = %violation.expectation,
                    calls = violation.calls,
                    "Verification failed"
                );
                return Err(violation.into_error());
            }
        }
    }
    debug!("All expectations verified");
    Ok(())
}

/// Collect every violation instead of stopping at the first.
pub fn report<'a, I>(clients: I, settings: &RegistrySettings) -> VerificationReport
where
    I: IntoIterator<Item = (&'a str, &'a [Arc<Expectation>])>,
{
    let mut report = VerificationReport::default();
    for (client, expectations) in clients {
        for expectation in expectations {
            report.checked += 1;
            if let Some(violation) = check(client, expectation, settings) {
                report.violations.push(violation);
            }
        }
    }
    report
}

/// Outcome of verifying every registered expectation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    violations: Vec<Violation>,
    checked: usize,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Number of expectations inspected.
    pub fn checked(&self) -> usize {
        self.checked
    }

    /// The first violation as an error, if any.
    pub fn into_result(self) -> MockResult<()> {
        match self.violations.into_iter().next() {
            Some(violation) => Err(violation.into_error()),
            None => Ok(()),
        }
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "{} expectation(s) verified", self.checked);
        }
        writeln!(
            f,
            "{} of {} expectation(s) failed verification:",
            self.violations.len(),
            self.checked
        )?;
        for violation in &self.violations {
            writeln!(f, "  - {}", violation)?;
        }
        Ok(())
    }
}
