//! Prompt assembly for the Miner's segment → `MinerOutput` call.
//!
//! Mirrors the teacher's `prompt_builder` split: callers assemble a
//! [`PromptInputs`] (doing the async few-shot lookup beforehand) and pass it
//! to [`build_miner_prompt`], which is purely synchronous and deterministic.

use engine_core::Segment;

use crate::few_shot::FewShotBundle;

const STATIC_INSTRUCTIONS: &str = "\
You extract structured claims, jargon, people, and mental models from a \
single transcript segment. Output strict JSON matching the miner_output \
schema. Every item must carry a `context_quote` copied verbatim from the \
segment; drop any item you cannot ground in the segment's text. Default \
`claim_type` to \"factual\" and `stance` to \"asserts\" when ambiguous.";

pub struct PromptInputs<'a> {
    pub segment: &'a Segment,
    pub few_shot: &'a FewShotBundle,
    pub schema_json: &'a str,
}

pub fn build_miner_prompt(inputs: &PromptInputs<'_>) -> String {
    let few_shot_block = build_few_shot_block(inputs.few_shot);
    let schema_block = format!("OUTPUT SCHEMA (miner_output.v1):\n{}", inputs.schema_json);
    let dynamic_suffix = build_dynamic_suffix(inputs.segment);

    // Static prefix first (instructions, few-shot, schema), dynamic data
    // last — prompt-prefix caches key on the longest identical prefix, so
    // reordering this breaks cache reuse across segments (spec §4.3).
    format!(
        "{STATIC_INSTRUCTIONS}\n\n{few_shot_block}\n\n{schema_block}\n\n{dynamic_suffix}"
    )
}

fn build_few_shot_block(bundle: &FewShotBundle) -> String {
    if bundle.accept.is_empty() && bundle.reject.is_empty() {
        return "FEW-SHOT EXAMPLES:\n(none available yet)".to_string();
    }

    let render = |label: &str, examples: &[crate::few_shot::FewShotExample]| -> String {
        if examples.is_empty() {
            return String::new();
        }
        let items = examples
            .iter()
            .map(|e| format!("  - [{:.2}] ({}) {}", e.similarity, e.reason_category, e.entity_text))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{label}:\n{items}\n")
    };

    format!(
        "FEW-SHOT EXAMPLES:\n{}{}",
        render("ACCEPTED", &bundle.accept),
        render("REJECTED", &bundle.reject),
    )
}

fn build_dynamic_suffix(segment: &Segment) -> String {
    format!(
        "SEGMENT:\nid: {}\nspeaker: {}\nt0: {}\nt1: {}\ntext: {}",
        segment.segment_id, segment.speaker, segment.t0, segment.t1, segment.text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::few_shot::FewShotExample;
    use engine_core::Segment;

    fn sample_segment() -> Segment {
        Segment {
            segment_id: "s1".into(),
            speaker: "host".into(),
            t0: 0.0,
            t1: 5.0,
            text: "inflation will ease next year".into(),
        }
    }

    #[test]
    fn static_content_precedes_dynamic_segment_data() {
        let bundle = FewShotBundle::default();
        let prompt = build_miner_prompt(&PromptInputs {
            segment: &sample_segment(),
            few_shot: &bundle,
            schema_json: "{}",
        });
        let instructions_pos = prompt.find("You extract structured").unwrap();
        let segment_pos = prompt.find("SEGMENT:").unwrap();
        assert!(instructions_pos < segment_pos);
    }

    #[test]
    fn few_shot_examples_render_in_caller_supplied_order() {
        let bundle = FewShotBundle {
            accept: vec![FewShotExample {
                entity_text: "rates rose".into(),
                reason_category: "well_sourced".into(),
                similarity: 0.91,
            }],
            reject: vec![],
        };
        let prompt = build_miner_prompt(&PromptInputs {
            segment: &sample_segment(),
            few_shot: &bundle,
            schema_json: "{}",
        });
        assert!(prompt.contains("ACCEPTED"));
        assert!(prompt.contains("rates rose"));
    }
}
