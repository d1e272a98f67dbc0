//! Dispatch behaviour, fixed when a store is built.

/// What dispatch does after a handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Run every remaining handler and report all failures.
    #[default]
    Continue,
    /// Stop at the first failure; remaining handlers are counted as skipped.
    StopOnFirst,
}

/// Options applied to every dispatch of an [`EventStore`](crate::EventStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Failure handling.
    pub failure_policy: FailurePolicy,
    /// Turn handler panics into [`InvocationCause::Panicked`](crate::InvocationCause::Panicked)
    /// failures instead of unwinding into the caller.
    pub catch_panics: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Continue,
            catch_panics: true,
        }
    }
}

impl DispatchOptions {
    /// Set the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Enable or disable panic capture.
    #[must_use]
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }
}

#[cfg(feature = "config")]
impl From<&evstore_config::DispatchConfig> for DispatchOptions {
    fn from(config: &evstore_config::DispatchConfig) -> Self {
        let failure_policy = match config.failure_policy {
            evstore_config::FailurePolicy::Continue => FailurePolicy::Continue,
            evstore_config::FailurePolicy::StopOnFirst => FailurePolicy::StopOnFirst,
        };
        Self {
            failure_policy,
            catch_panics: config.catch_panics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DispatchOptions::default();
        assert_eq!(options.failure_policy, FailurePolicy::Continue);
        assert!(options.catch_panics);
    }

    #[test]
    fn test_builder() {
        let options = DispatchOptions::default()
            .with_failure_policy(FailurePolicy::StopOnFirst)
            .with_catch_panics(false);
        assert_eq!(options.failure_policy, FailurePolicy::StopOnFirst);
        assert!(!options.catch_panics);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_config() {
        let config = evstore_config::DispatchConfig {
            failure_policy: evstore_config::FailurePolicy::StopOnFirst,
            catch_panics: false,
        };
        let options = DispatchOptions::from(&config);
        assert_eq!(options.failure_policy, FailurePolicy::StopOnFirst);
        assert!(!options.catch_panics);
    }
}
