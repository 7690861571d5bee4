//! Prompt templates sent to the assistant CLI
//!
//! Change mode wraps the user's request with formatting rules the edit
//! parser understands. Brainstorming builds a methodology-driven prompt.

use serde::{Deserialize, Serialize};

/// Wrap a request so the assistant answers in the change mode edit grammar
pub fn build_change_mode_prompt(user_prompt: &str) -> String {
    format!(
        "[CHANGEMODE INSTRUCTIONS]\n\
         You are producing code edits that will be applied mechanically. \
         Do not use any file-editing tools; describe every change in text.\n\
         \n\
         For each change, output a header line with the file path and the first \
         line number being replaced, followed by a fenced block containing an OLD \
         section and a NEW section, in this exact shape:\n\
         \n\
         **FILE: <path>:<line>**\n\
         (three backticks)\n\
         OLD:\n\
         <exact existing lines, copied verbatim, or nothing for an insertion>\n\
         NEW:\n\
         <replacement lines, or nothing for a deletion>\n\
         (three backticks)\n\
         \n\
         Rules:\n\
         - OLD must match the current file content exactly, including indentation.\n\
         - Use one block per contiguous change; repeat the header for each block.\n\
         - Keep blocks for the same file together and in ascending line order.\n\
         - Do not add commentary inside the blocks.\n\
         \n\
         [USER REQUEST]\n\
         {}",
        user_prompt.trim()
    )
}

/// Brainstorming framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Methodology {
    /// Generate many ideas without judging them
    Divergent,
    /// Refine and combine existing ideas
    Convergent,
    /// Systematic SCAMPER triggers
    Scamper,
    /// Human-centered design thinking
    DesignThinking,
    /// Unexpected connections between fields
    Lateral,
    /// Blend of the other frameworks
    #[default]
    Auto,
}

impl Methodology {
    /// Name as accepted in tool input
    pub fn as_str(&self) -> &'static str {
        match self {
            Methodology::Divergent => "divergent",
            Methodology::Convergent => "convergent",
            Methodology::Scamper => "scamper",
            Methodology::DesignThinking => "design-thinking",
            Methodology::Lateral => "lateral",
            Methodology::Auto => "auto",
        }
    }

    fn instructions(&self, domain: Option<&str>) -> String {
        match self {
            Methodology::Divergent => "Use Divergent Thinking: generate a large quantity of ideas without \
                self-censoring, build on wild ideas, combine unrelated concepts and postpone evaluation \
                until every idea is on the table."
                .to_string(),
            Methodology::Convergent => "Use Convergent Thinking: refine and improve existing concepts, \
                synthesize related ideas into stronger solutions and prioritize by feasibility and impact."
                .to_string(),
            Methodology::Scamper => "Use SCAMPER triggers: Substitute, Combine, Adapt, Modify, \
                Put to other use, Eliminate, Reverse."
                .to_string(),
            Methodology::DesignThinking => "Use Design Thinking: empathize with user needs, define the \
                problem from the user's perspective and ideate testable, user-focused solutions."
                .to_string(),
            Methodology::Lateral => "Use Lateral Thinking: make unexpected connections between unrelated \
                fields, challenge fundamental assumptions and borrow metaphors from other domains."
                .to_string(),
            Methodology::Auto => match domain {
                Some(domain) => format!(
                    "For the {} domain, combine divergent exploration, SCAMPER triggers, lateral \
                     thinking and a human-centered perspective for practical value.",
                    domain
                ),
                None => "Combine divergent exploration, SCAMPER triggers, lateral thinking and a \
                    human-centered perspective for practical value."
                    .to_string(),
            },
        }
    }
}

/// Inputs for a brainstorming prompt
#[derive(Debug, Clone, PartialEq)]
pub struct BrainstormRequest {
    /// The challenge to explore
    pub prompt: String,
    /// Framework to apply
    pub methodology: Methodology,
    /// Domain context (e.g. "software")
    pub domain: Option<String>,
    /// Known limitations
    pub constraints: Option<String>,
    /// Background or previous attempts
    pub existing_context: Option<String>,
    /// Target number of ideas
    pub idea_count: u32,
    /// Ask for feasibility/impact/innovation ratings
    pub include_analysis: bool,
}

/// Build the brainstorming prompt
pub fn build_brainstorm_prompt(request: &BrainstormRequest) -> String {
    let framework = request.methodology.instructions(request.domain.as_deref());

    let context: Vec<String> = [
        ("Domain", request.domain.as_deref()),
        ("Constraints", request.constraints.as_deref()),
        ("Background", request.existing_context.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|v| format!("- {}: {}", label, v)))
    .collect();

    let context_section = if context.is_empty() {
        String::new()
    } else {
        format!("\n\nContext to consider:\n{}", context.join("\n"))
    };

    let analysis = if request.include_analysis {
        " For each idea, also rate Feasibility (1-5), Impact (1-5), and Innovation (1-5), \
         with a one-sentence assessment."
    } else {
        ""
    };

    // The challenge stays inline so CLI extensions do not intercept it.
    format!(
        "Please brainstorm {count} creative ideas for: \"{prompt}\"\n\n\
         {framework}{context_section}\n\n\
         Requirements:\n\
         - Each idea must be unique and non-obvious\n\
         - Focus on actionable, implementable concepts\n\
         - Give each idea a creative name and 2-3 sentence description{analysis}\n\n\
         Format each idea as: \"Idea N: [Name]\" followed by the description{ratings}.",
        count = request.idea_count,
        prompt = request.prompt.trim(),
        ratings = if request.include_analysis { " and ratings" } else { "" },
    )
}
