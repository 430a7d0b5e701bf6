use contrail::trace::{
    Link, SamplingDecision, SamplingResult, SpanKind, TraceContextExt, TraceState,
};
use contrail::{Context, KeyValue, TraceId};

/// The interface samplers implement to decide, just before a span is
/// created, whether it is recorded and/or marked sampled.
///
/// Two properties control data collection: `is_recording()` on the span
/// (whether mutations are stored in-process) and the `sampled` flag in the
/// span context (whether exporters receive the span, propagated to
/// children). A sampler chooses both through its [`SamplingDecision`].
///
/// The suppression check runs before the sampler, so samplers never see
/// creation attempts that were deduplicated away.
pub trait ShouldSample: CloneShouldSample + Send + Sync + std::fmt::Debug {
    /// The [`SamplingResult`] for a span about to be created.
    #[allow(clippy::too_many_arguments)]
    fn should_sample(
        &self,
        parent_context: Option<&Context>,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult;
}

/// This trait should not be used directly; it exists so boxed samplers can
/// be cloned. Use [`ShouldSample`] instead.
pub trait CloneShouldSample {
    /// Clone this sampler into a new box.
    fn box_clone(&self) -> Box<dyn ShouldSample>;
}

impl<T> CloneShouldSample for T
where
    T: ShouldSample + Clone + 'static,
{
    fn box_clone(&self) -> Box<dyn ShouldSample> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ShouldSample> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Built-in sampling policies.
///
/// These cover the common cases; implement [`ShouldSample`] for anything
/// more elaborate.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Sampler {
    /// Always sample the trace.
    AlwaysOn,
    /// Never sample the trace.
    AlwaysOff,
    /// Respect the parent span's sampling decision, delegating to the inner
    /// sampler for root spans.
    ParentBased(Box<dyn ShouldSample>),
    /// Sample a given fraction of traces, derived deterministically from the
    /// trace id so every participant in a trace agrees. Fractions >= 1
    /// always sample, fractions < 0 are treated as zero.
    TraceIdRatioBased(f64),
}

impl ShouldSample for Sampler {
    fn should_sample(
        &self,
        parent_context: Option<&Context>,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult {
        let decision = match self {
            Sampler::AlwaysOn => SamplingDecision::RecordAndSample,
            Sampler::AlwaysOff => SamplingDecision::Drop,
            Sampler::ParentBased(delegate) => parent_context
                .filter(|cx| cx.has_active_span())
                .map_or_else(
                    || {
                        delegate
                            .should_sample(
                                parent_context,
                                trace_id,
                                name,
                                span_kind,
                                attributes,
                                links,
                            )
                            .decision
                    },
                    |cx| {
                        if cx.span().span_context().is_sampled() {
                            SamplingDecision::RecordAndSample
                        } else {
                            SamplingDecision::Drop
                        }
                    },
                ),
            Sampler::TraceIdRatioBased(prob) => sample_based_on_probability(prob, trace_id),
        };
        SamplingResult {
            decision,
            // The built-in samplers never contribute attributes.
            attributes: Vec::new(),
            // The built-in samplers pass the parent's trace state through.
            trace_state: match parent_context {
                Some(cx) => cx.span().span_context().trace_state().clone(),
                None => TraceState::default(),
            },
        }
    }
}

fn sample_based_on_probability(prob: &f64, trace_id: TraceId) -> SamplingDecision {
    if *prob >= 1.0 {
        return SamplingDecision::RecordAndSample;
    }
    let prob_upper_bound = (prob.max(0.0) * (1u64 << 63) as f64) as u64;
    // The least significant half of the trace id is the random part; shift
    // out the low bit to match the 63-bit bound.
    let bytes = trace_id.to_bytes();
    let (_, low) = bytes.split_at(8);
    let trace_id_low = u64::from_be_bytes(low.try_into().unwrap());
    let rnd_from_trace_id = trace_id_low >> 1;

    if rnd_from_trace_id < prob_upper_bound {
        SamplingDecision::RecordAndSample
    } else {
        SamplingDecision::Drop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::trace::TestSpan;
    use contrail::trace::{SpanContext, TraceFlags};
    use contrail::SpanId;

    fn parent_cx(sampled: bool) -> Context {
        Context::new().with_span(TestSpan(SpanContext::new(
            TraceId::from(1u128),
            SpanId::from(1u64),
            TraceFlags::default().with_sampled(sampled),
            false,
            TraceState::default(),
        )))
    }

    fn decide(sampler: &Sampler, parent: Option<&Context>, trace_id: u128) -> SamplingDecision {
        sampler
            .should_sample(
                parent,
                TraceId::from(trace_id),
                "test",
                &SpanKind::Internal,
                &[],
                &[],
            )
            .decision
    }

    #[test]
    fn constant_samplers() {
        assert_eq!(
            decide(&Sampler::AlwaysOn, None, 1),
            SamplingDecision::RecordAndSample
        );
        assert_eq!(decide(&Sampler::AlwaysOff, None, 1), SamplingDecision::Drop);
    }

    #[test]
    fn ratio_bounds() {
        // Fractions >= 1 always sample, fractions <= 0 never do.
        for trace_id in [1u128, u128::MAX / 2, u128::MAX] {
            assert_eq!(
                decide(&Sampler::TraceIdRatioBased(2.0), None, trace_id),
                SamplingDecision::RecordAndSample
            );
            assert_eq!(
                decide(&Sampler::TraceIdRatioBased(-1.0), None, trace_id),
                SamplingDecision::Drop
            );
        }
    }

    #[test]
    fn ratio_is_deterministic_per_trace_id() {
        let sampler = Sampler::TraceIdRatioBased(0.5);
        for trace_id in [7u128, 1 << 70, u128::MAX - 3] {
            assert_eq!(
                decide(&sampler, None, trace_id),
                decide(&sampler, None, trace_id)
            );
        }
    }

    #[test]
    fn parent_based_follows_the_parent() {
        let sampler = Sampler::ParentBased(Box::new(Sampler::AlwaysOff));
        let sampled_parent = parent_cx(true);
        assert_eq!(
            decide(&sampler, Some(&sampled_parent), 1),
            SamplingDecision::RecordAndSample
        );

        let sampler = Sampler::ParentBased(Box::new(Sampler::AlwaysOn));
        let unsampled_parent = parent_cx(false);
        assert_eq!(
            decide(&sampler, Some(&unsampled_parent), 1),
            SamplingDecision::Drop
        );
    }

    #[test]
    fn parent_based_delegates_for_roots() {
        let sampler = Sampler::ParentBased(Box::new(Sampler::AlwaysOn));
        assert_eq!(
            decide(&sampler, Some(&Context::new()), 1),
            SamplingDecision::RecordAndSample
        );
        assert_eq!(decide(&sampler, None, 1), SamplingDecision::RecordAndSample);
    }

    #[test]
    fn built_ins_propagate_parent_trace_state() {
        let trace_state = TraceState::from_key_value([("vendor", "x")]).unwrap();
        let cx = Context::new().with_span(TestSpan(SpanContext::new(
            TraceId::from(1u128),
            SpanId::from(1u64),
            TraceFlags::SAMPLED,
            false,
            trace_state.clone(),
        )));
        let result = Sampler::AlwaysOn.should_sample(
            Some(&cx),
            TraceId::from(1u128),
            "test",
            &SpanKind::Client,
            &[],
            &[],
        );
        assert_eq!(result.trace_state, trace_state);
    }

    #[test]
    fn boxed_samplers_clone() {
        let sampler = Sampler::ParentBased(Box::new(Sampler::AlwaysOn));
        let cloned = sampler.clone();
        assert_eq!(decide(&sampler, None, 1), decide(&cloned, None, 1));
    }
}
