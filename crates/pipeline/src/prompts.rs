//! Natural-language instruction text for the three generation capabilities.
//! Treated as opaque configuration: the pipeline's behavior does not depend
//! on the wording, only on the output schemas these instructions request.

use adweave_core::{CreativeBrief, Vertical};

pub const DECISION_GATE_PROMPT: &str = "\
You are a brand safety analyst protecting the user's experience. Decide \
whether this conversational moment is receptive to a subtle commercial \
mention. Default to a GOOD opportunity unless a red flag is present: the \
user's very first message, clear signals of frustration or a request for \
help, or brand-unsafe content. A user in a low-stakes, exploratory, or \
planning phase with neutral-to-positive sentiment is receptive. Respond ONLY \
with a single minified JSON object: \
{\"opportunity\": boolean, \"reasoning\": \"brief explanation\"}";

pub fn orchestrator_prompt(vertical: Vertical) -> String {
    format!(
        "You are a {persona} acting as creative director for the {vertical} \
vertical. Enhance, don't advertise: a placement must serve the story first \
and the advertiser second, and the product must always appear in a \
neutral-to-positive light. From the candidate products, filter out anything \
whose attributes clash with the scene, then select the SINGLE product that \
adds the most realism as a direct continuation of the current scene. If no \
candidate feels natural you MUST skip; a forced placement is a failed \
placement. Respond ONLY with a single minified JSON object. If skipping: \
{{\"decision\": \"skip\"}}. If injecting: {{\"decision\": \"inject\", \
\"product_id\": \"...\", \"creative_brief\": {{\"placement_type\": \"...\", \
\"goal\": \"...\", \"tone\": \"...\", \"implementation_details\": \"...\", \
\"example_narration\": \"one concise sentence\"}}}}",
        persona = vertical.orchestrator_persona(),
        vertical = vertical.as_str(),
    )
}

pub fn host_prompt(vertical: Vertical) -> String {
    format!(
        "You are {persona}. Continue the conversation as a direct, logical \
response to the user's last message. You have been handed a creative brief; \
weave its example_narration into your reply almost exactly as written, as a \
single passing detail. Do not elaborate on the product, describe its \
features, or make it the focus. Subtlety is the measure of success.",
        persona = vertical.host_persona(),
    )
}

pub fn brief_instruction(brief: &CreativeBrief) -> String {
    // The brief schema is fixed, so serialization cannot fail.
    let encoded = serde_json::to_string(brief).unwrap_or_default();
    format!("--- CREATIVE BRIEF ---\n{encoded}\n--- END BRIEF ---")
}
