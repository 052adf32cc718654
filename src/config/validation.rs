//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for structural
//! errors such as empty groups, duplicate names, rules referencing
//! unknown groups, non-absolute prefixes, rewrite prefixes that do not
//! prefix their rule, and weight maps that do not cover the target set.
//! Returns a list of [`ValidationError`] values with per-field
//! suggestions. Any error is fatal at startup.

use std::collections::HashSet;

use super::model::{Config, GroupConfig, PolicyKind};
use crate::error::ValidationError;

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.groups.is_empty() {
        errors.push(ValidationError {
            scope: "(root)".into(),
            field: "groups".into(),
            message: "at least one target group must be defined".into(),
            suggestion: None,
        });
    }

    if config.rules.is_empty() {
        errors.push(ValidationError {
            scope: "(root)".into(),
            field: "rules".into(),
            message: "at least one listener rule must be defined".into(),
            suggestion: Some("add a catch-all rule with prefix '/'".into()),
        });
    }

    let mut seen_groups = HashSet::new();

    for (i, group) in config.groups.iter().enumerate() {
        let scope = if group.name.is_empty() {
            format!("groups[{i}]")
        } else {
            group.name.clone()
        };

        if group.name.is_empty() {
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "name".into(),
                message: "group name cannot be empty".into(),
                suggestion: None,
            });
        }

        if !seen_groups.insert(&group.name) {
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "name".into(),
                message: "duplicate group name".into(),
                suggestion: None,
            });
        }

        if group.targets.is_empty() {
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "targets".into(),
                message: "at least one target endpoint must be defined".into(),
                suggestion: None,
            });
        }

        for (j, endpoint) in group.targets.iter().enumerate() {
            if endpoint.host.is_empty() {
                errors.push(ValidationError {
                    scope: scope.clone(),
                    field: format!("targets[{j}].host"),
                    message: "host cannot be empty".into(),
                    suggestion: None,
                });
            }
            if endpoint.port == 0 {
                errors.push(ValidationError {
                    scope: scope.clone(),
                    field: format!("targets[{j}].port"),
                    message: "port cannot be 0".into(),
                    suggestion: None,
                });
            }
            if let Some(ref base) = endpoint.base_uri {
                if !base.starts_with('/') {
                    errors.push(ValidationError {
                        scope: scope.clone(),
                        field: format!("targets[{j}].base_uri"),
                        message: "base_uri must start with '/'".into(),
                        suggestion: Some(format!("did you mean '/{base}'?")),
                    });
                }
            }
        }

        validate_weights(group, &scope, &mut errors);

        if group.policy == PolicyKind::Sticky && config.listener.session_ttl_ms.is_none() {
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "policy".into(),
                message: "sticky policy requires listener.session_ttl_ms".into(),
                suggestion: None,
            });
        }

        if let Some(ref hc) = group.health_check {
            if !hc.path.starts_with('/') {
                errors.push(ValidationError {
                    scope: scope.clone(),
                    field: "health_check.path".into(),
                    message: "path must start with '/'".into(),
                    suggestion: Some(format!("did you mean '/{}'?", hc.path)),
                });
            }
            if hc.interval_ms == 0 {
                errors.push(ValidationError {
                    scope: scope.clone(),
                    field: "health_check.interval_ms".into(),
                    message: "interval must be at least 1 ms".into(),
                    suggestion: None,
                });
            }
            if hc.succeed_threshold == 0 || hc.failure_threshold == 0 {
                errors.push(ValidationError {
                    scope: scope.clone(),
                    field: "health_check".into(),
                    message: "thresholds must be at least 1".into(),
                    suggestion: None,
                });
            }
        }
    }

    for (i, rule) in config.rules.iter().enumerate() {
        let scope = format!("rules[{i}]");

        if rule.prefix.is_empty() {
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "prefix".into(),
                message: "prefix cannot be empty".into(),
                suggestion: None,
            });
        } else if !rule.prefix.starts_with('/') {
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "prefix".into(),
                message: "prefix must start with '/'".into(),
                suggestion: Some(format!("did you mean '/{}'?", rule.prefix)),
            });
        }

        if !rule.rewrite.is_empty() && !rule.prefix.starts_with(&rule.rewrite) {
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "rewrite".into(),
                message: format!(
                    "'{}' is not a prefix of the rule prefix '{}'",
                    rule.rewrite, rule.prefix
                ),
                suggestion: None,
            });
        }

        if config.group(&rule.group).is_none() {
            errors.push(ValidationError {
                scope: scope.clone(),
                field: "group".into(),
                message: format!("unknown target group '{}'", rule.group),
                suggestion: None,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Weighted groups need a weight for every endpoint (by `host:port` or
/// bare host) and no leftover keys; other policies must not carry a
/// weight map.
fn validate_weights(group: &GroupConfig, scope: &str, errors: &mut Vec<ValidationError>) {
    match (&group.weights, group.policy) {
        (None, PolicyKind::Weighted) => {
            errors.push(ValidationError {
                scope: scope.to_string(),
                field: "weights".into(),
                message: "weighted policy requires a weight map".into(),
                suggestion: Some("add a weights entry per target, e.g. \"host:port\": 3".into()),
            });
        }
        (Some(_), policy) if policy != PolicyKind::Weighted => {
            errors.push(ValidationError {
                scope: scope.to_string(),
                field: "weights".into(),
                message: format!("weights are only valid with the weighted policy, not {}", policy.as_str()),
                suggestion: None,
            });
        }
        (Some(weights), PolicyKind::Weighted) => {
            let mut used = HashSet::new();
            for (j, endpoint) in group.targets.iter().enumerate() {
                let key = endpoint.weight_key();
                let found = weights
                    .get_key_value(&key)
                    .or_else(|| weights.get_key_value(&endpoint.host));
                match found {
                    Some((k, &weight)) => {
                        used.insert(k.clone());
                        if weight == 0 {
                            errors.push(ValidationError {
                                scope: scope.to_string(),
                                field: format!("weights.\"{k}\""),
                                message: "weight must be at least 1".into(),
                                suggestion: None,
                            });
                        }
                    }
                    None => {
                        errors.push(ValidationError {
                            scope: scope.to_string(),
                            field: format!("targets[{j}]"),
                            message: format!("no weight for endpoint '{key}'"),
                            suggestion: None,
                        });
                    }
                }
            }
            for key in weights.keys() {
                if !used.contains(key) {
                    errors.push(ValidationError {
                        scope: scope.to_string(),
                        field: format!("weights.\"{key}\""),
                        message: "weight does not match any endpoint".into(),
                        suggestion: None,
                    });
                }
            }
        }
        (None, _) => {}
        (Some(_), _) => unreachable!("covered by the guarded arm above"),
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    format!(
        "{path} is valid\n  {} groups, {} endpoints, {} rules",
        config.groups.len(),
        config.total_endpoints(),
        config.rules.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config_str;

    fn minimal() -> Config {
        parse_config_str(
            "yaml",
            r"
groups:
  - name: web
    policy: round_robin
    targets:
      - host: 127.0.0.1
        port: 8081
rules:
  - prefix: /
    group: web
",
            "test.yaml",
        )
        .unwrap()
    }

    #[test]
    fn minimal_config_validates() {
        validate(&minimal()).unwrap();
    }

    #[test]
    fn empty_groups_rejected() {
        let mut config = minimal();
        config.groups.clear();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "groups"));
    }

    #[test]
    fn unknown_group_in_rule_rejected() {
        let mut config = minimal();
        config.rules[0].group = "nope".into();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("unknown target group")));
    }

    #[test]
    fn relative_prefix_rejected() {
        let mut config = minimal();
        config.rules[0].prefix = "api".into();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("start with '/'")));
    }

    #[test]
    fn rewrite_must_prefix_the_rule() {
        let mut config = minimal();
        config.rules[0].prefix = "/api".into();
        config.rules[0].rewrite = "/web".into();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "rewrite"));
    }

    #[test]
    fn weighted_without_weights_rejected() {
        let mut config = minimal();
        config.groups[0].policy = PolicyKind::Weighted;
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "weights"));
    }

    #[test]
    fn weights_must_cover_every_endpoint() {
        let config = parse_config_str(
            "yaml",
            r#"
groups:
  - name: web
    policy: weighted
    targets:
      - host: a.internal
        port: 8081
      - host: b.internal
        port: 8082
    weights:
      "a.internal:8081": 3
rules:
  - prefix: /
    group: web
"#,
            "test.yaml",
        )
        .unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("no weight for endpoint")));
    }

    #[test]
    fn unknown_weight_key_rejected() {
        let config = parse_config_str(
            "yaml",
            r#"
groups:
  - name: web
    policy: weighted
    targets:
      - host: a.internal
        port: 8081
    weights:
      "a.internal": 3
      "ghost:9999": 1
rules:
  - prefix: /
    group: web
"#,
            "test.yaml",
        )
        .unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.message.contains("does not match any endpoint")));
    }

    #[test]
    fn bare_host_weight_key_accepted() {
        let config = parse_config_str(
            "yaml",
            r#"
groups:
  - name: web
    policy: weighted
    targets:
      - host: a.internal
        port: 8081
    weights:
      "a.internal": 3
rules:
  - prefix: /
    group: web
"#,
            "test.yaml",
        )
        .unwrap();
        validate(&config).unwrap();
    }

    #[test]
    fn sticky_requires_session_ttl() {
        let mut config = minimal();
        config.groups[0].policy = PolicyKind::Sticky;
        let errors = validate(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.message.contains("session_ttl_ms")));

        config.listener.session_ttl_ms = Some(10_000);
        validate(&config).unwrap();
    }

    #[test]
    fn zero_thresholds_rejected() {
        let config = parse_config_str(
            "yaml",
            r"
groups:
  - name: web
    policy: round_robin
    targets:
      - host: 127.0.0.1
        port: 8081
    health_check:
      succeed_threshold: 0
rules:
  - prefix: /
    group: web
",
            "test.yaml",
        )
        .unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("thresholds")));
    }
}
