use tracing::debug;
use wsync_store::RecordStore;

use crate::config::ValidatorConfig;
use crate::error::{GateError, ValidationError};
use crate::rule::{RecordCandidate, ValidationRule};
use crate::rules::{
    CollectionRule, IdRule, ModifiedRule, PayloadRule, ReferenceRule, SortIndexRule,
};

/// The record validator: a pipeline of independent rules that every
/// candidate passes through before it may be written.
///
/// Unlike a fail-fast gate, the pipeline runs every rule and accumulates
/// every violation, in rule order. An empty result means the candidate is
/// acceptable.
pub struct RecordValidator {
    rules: Vec<Box<dyn ValidationRule>>,
    config: ValidatorConfig,
}

impl RecordValidator {
    /// Create a validator with the given configuration and no rules.
    ///
    /// Use [`Self::add_rule`] to add rules, or [`Self::with_default_rules`]
    /// for the standard pipeline.
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            rules: Vec::new(),
            config,
        }
    }

    /// Create a validator with the default rule pipeline:
    /// id -> collection -> parentid -> predecessorid -> modified ->
    /// sortindex -> payload
    pub fn with_default_rules(config: ValidatorConfig) -> Self {
        let max_payload = config.max_payload_bytes;
        let mut validator = Self::new(config);
        validator.add_rule(Box::new(IdRule));
        validator.add_rule(Box::new(CollectionRule));
        validator.add_rule(Box::new(ReferenceRule::parentid()));
        validator.add_rule(Box::new(ReferenceRule::predecessorid()));
        validator.add_rule(Box::new(ModifiedRule));
        validator.add_rule(Box::new(SortIndexRule));
        validator.add_rule(Box::new(PayloadRule::new(max_payload)));
        validator
    }

    /// Append a rule to the end of the pipeline.
    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    /// The current configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Number of rules in the pipeline.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Run every rule against `candidate`.
    ///
    /// Rule violations are returned, never raised. `Err` is reserved for
    /// failures of the validation itself, such as a store outage during a
    /// referential lookup.
    pub fn validate(
        &self,
        candidate: &RecordCandidate,
        store: &dyn RecordStore,
    ) -> Result<Vec<ValidationError>, GateError> {
        let mut errors = Vec::new();
        for rule in &self.rules {
            if let Some(error) = rule.check(candidate, store)? {
                debug!(rule = rule.name(), %error, "validation rule failed");
                errors.push(error);
            }
        }
        Ok(errors)
    }
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::with_default_rules(ValidatorConfig::default())
    }
}

impl std::fmt::Debug for RecordValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|r| r.name()).collect();
        f.debug_struct("RecordValidator")
            .field("rules", &names)
            .field("config", &self.config)
            .finish()
    }
}
