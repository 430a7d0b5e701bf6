//! SDK tracing configuration.
//!
//! [`Config`] bundles the sampler, id generator, span limits, resource and
//! suppression strategy shared by every tracer of one provider. Defaults
//! come from a single environment read at construction time; every value
//! can also be set programmatically through the provider builder, so tests
//! never depend on process-global state.

use crate::resource::Resource;
use crate::trace::{
    IdGenerator, RandomIdGenerator, Sampler, ShouldSample, SpanLimits, SuppressionStrategy,
};
use contrail::trail_warn;
use std::env;
use std::str::FromStr;

/// Environment variable bounding the attribute count per span.
const SPAN_ATTRIBUTE_COUNT_LIMIT_ENV: &str = "CONTRAIL_SPAN_ATTRIBUTE_COUNT_LIMIT";
/// Environment variable bounding the event count per span.
const SPAN_EVENT_COUNT_LIMIT_ENV: &str = "CONTRAIL_SPAN_EVENT_COUNT_LIMIT";
/// Environment variable bounding the link count per span.
const SPAN_LINK_COUNT_LIMIT_ENV: &str = "CONTRAIL_SPAN_LINK_COUNT_LIMIT";
/// Environment variable selecting the sampler.
const TRACES_SAMPLER_ENV: &str = "CONTRAIL_TRACES_SAMPLER";
/// Environment variable carrying the sampler argument (the ratio).
const TRACES_SAMPLER_ARG_ENV: &str = "CONTRAIL_TRACES_SAMPLER_ARG";

/// Tracer configuration shared by all tracers of a provider.
#[derive(Debug)]
#[non_exhaustive]
pub struct Config {
    /// The sampler consulted for every non-suppressed creation attempt.
    pub sampler: Box<dyn ShouldSample>,

    /// The generator for trace and span ids.
    pub id_generator: Box<dyn IdGenerator>,

    /// Bounds on per-span data.
    pub span_limits: SpanLimits,

    /// Attributes describing the entity producing the telemetry.
    pub resource: Resource,

    /// Granularity for duplicate-span suppression.
    pub suppression_strategy: SuppressionStrategy,
}

impl Default for Config {
    /// The default configuration, overlaid with any environment overrides.
    fn default() -> Self {
        let mut config = Config {
            sampler: Box::new(Sampler::ParentBased(Box::new(Sampler::AlwaysOn))),
            id_generator: Box::<RandomIdGenerator>::default(),
            span_limits: SpanLimits::default(),
            resource: Resource::builder().build(),
            suppression_strategy: SuppressionStrategy::from_env(),
        };

        if let Some(max_attributes_per_span) = env::var(SPAN_ATTRIBUTE_COUNT_LIMIT_ENV)
            .ok()
            .and_then(|count_limit| u32::from_str(&count_limit).ok())
        {
            config.span_limits.max_attributes_per_span = max_attributes_per_span;
        }

        if let Some(max_events_per_span) = env::var(SPAN_EVENT_COUNT_LIMIT_ENV)
            .ok()
            .and_then(|max_events| u32::from_str(&max_events).ok())
        {
            config.span_limits.max_events_per_span = max_events_per_span;
        }

        if let Some(max_links_per_span) = env::var(SPAN_LINK_COUNT_LIMIT_ENV)
            .ok()
            .and_then(|max_links| u32::from_str(&max_links).ok())
        {
            config.span_limits.max_links_per_span = max_links_per_span;
        }

        let sampler_arg = env::var(TRACES_SAMPLER_ARG_ENV).ok();
        if let Ok(sampler) = env::var(TRACES_SAMPLER_ENV) {
            config.sampler = sampler_from_env(&sampler, sampler_arg.as_deref());
        }

        config
    }
}

fn sampler_from_env(sampler: &str, sampler_arg: Option<&str>) -> Box<dyn ShouldSample> {
    let ratio = |arg: Option<&str>| {
        arg.and_then(|r| r.parse::<f64>().ok()).unwrap_or_else(|| {
            trail_warn!(
                name: "Config.InvalidSamplerArgument",
                message = "sampler ratio missing or unparsable, using 1.0"
            );
            1.0
        })
    };

    match sampler {
        "always_on" => Box::new(Sampler::AlwaysOn),
        "always_off" => Box::new(Sampler::AlwaysOff),
        "traceidratio" => Box::new(Sampler::TraceIdRatioBased(ratio(sampler_arg))),
        "parentbased_always_on" => Box::new(Sampler::ParentBased(Box::new(Sampler::AlwaysOn))),
        "parentbased_always_off" => Box::new(Sampler::ParentBased(Box::new(Sampler::AlwaysOff))),
        "parentbased_traceidratio" => Box::new(Sampler::ParentBased(Box::new(
            Sampler::TraceIdRatioBased(ratio(sampler_arg)),
        ))),
        unrecognized => {
            trail_warn!(
                name: "Config.InvalidSamplerType",
                value = unrecognized.to_owned()
            );
            Box::new(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_from_env() {
        temp_env::with_var(SPAN_ATTRIBUTE_COUNT_LIMIT_ENV, Some("12"), || {
            assert_eq!(Config::default().span_limits.max_attributes_per_span, 12);
        });
        temp_env::with_var(SPAN_EVENT_COUNT_LIMIT_ENV, Some("7"), || {
            assert_eq!(Config::default().span_limits.max_events_per_span, 7);
        });
        temp_env::with_var(SPAN_LINK_COUNT_LIMIT_ENV, Some("not-a-number"), || {
            assert_eq!(
                Config::default().span_limits.max_links_per_span,
                SpanLimits::default().max_links_per_span
            );
        });
    }

    #[test]
    fn suppression_strategy_from_env() {
        temp_env::with_var(
            crate::trace::suppression::SUPPRESSION_STRATEGY_ENV,
            Some("by_kind_and_type"),
            || {
                assert_eq!(
                    Config::default().suppression_strategy,
                    SuppressionStrategy::ByKindAndType
                );
            },
        );
        temp_env::with_var_unset(crate::trace::suppression::SUPPRESSION_STRATEGY_ENV, || {
            assert_eq!(
                Config::default().suppression_strategy,
                SuppressionStrategy::None
            );
        });
    }

    #[test]
    fn sampler_from_env_values() {
        temp_env::with_vars(
            [
                (TRACES_SAMPLER_ENV, Some("traceidratio")),
                (TRACES_SAMPLER_ARG_ENV, Some("0.25")),
            ],
            || {
                let config = Config::default();
                assert!(format!("{:?}", config.sampler).contains("0.25"));
            },
        );
        temp_env::with_var(TRACES_SAMPLER_ENV, Some("nonsense"), || {
            let config = Config::default();
            assert!(format!("{:?}", config.sampler).contains("ParentBased"));
        });
    }
}
