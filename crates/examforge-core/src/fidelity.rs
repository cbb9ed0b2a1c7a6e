//! Cognitive-fidelity rule tables.
//!
//! One static rule set per cognitive level: the operation verbs the
//! registry rotates through, the mental-action contract sent to the
//! generative service, and the forbidden phrasing patterns that disqualify
//! a candidate. Labeling an item "analysis" is not sufficient — its content
//! must actually require analysis, so the same table drives both prompt
//! construction and candidate rejection. Kept as data, not control flow,
//! so the rule set is testable and extensible independent of the
//! generation loop.

use crate::model::CognitiveLevel;

/// The fidelity contract for one cognitive level.
#[derive(Debug)]
pub struct LevelRules {
    pub level: CognitiveLevel,
    /// Cognitive-operation verbs, rotated per topic × level by the registry.
    pub operations: &'static [&'static str],
    /// Natural-language description of the mental action the student must
    /// perform; included verbatim in generation requests.
    pub action_contract: &'static str,
    /// Lowercased phrasing patterns that disqualify a candidate's stem or
    /// answer at this level.
    pub forbidden_patterns: &'static [&'static str],
    /// Hint describing the expected answer shape.
    pub answer_hint: &'static str,
}

static REMEMBERING: LevelRules = LevelRules {
    level: CognitiveLevel::Remembering,
    operations: &["define", "identify", "list", "label", "recall", "name"],
    action_contract: "must retrieve a specific fact, term, or definition from memory",
    forbidden_patterns: &[],
    answer_hint: "a single fact, term, or definition",
};

static UNDERSTANDING: LevelRules = LevelRules {
    level: CognitiveLevel::Understanding,
    operations: &[
        "explain",
        "summarize",
        "paraphrase",
        "classify",
        "illustrate",
        "interpret",
    ],
    action_contract: "must restate or interpret the idea in their own words, not quote a definition",
    forbidden_patterns: &["state the definition of"],
    answer_hint: "an explanation in the student's own words",
};

static APPLYING: LevelRules = LevelRules {
    level: CognitiveLevel::Applying,
    operations: &["apply", "demonstrate", "solve", "implement", "compute", "use"],
    action_contract: "must carry out a known procedure in a concrete, novel situation",
    forbidden_patterns: &["is defined as", "state the definition of"],
    answer_hint: "a worked result or the correctly chosen procedure",
};

static ANALYZING: LevelRules = LevelRules {
    level: CognitiveLevel::Analyzing,
    operations: &[
        "differentiate",
        "compare",
        "organize",
        "deconstruct",
        "attribute",
        "contrast",
    ],
    action_contract:
        "must break the subject into components and identify relationships between them",
    forbidden_patterns: &[
        "key factors include",
        "such as",
        "list the",
        "name the",
        "is defined as",
    ],
    answer_hint: "a comparison, decomposition, or identified relationship",
};

static EVALUATING: LevelRules = LevelRules {
    level: CognitiveLevel::Evaluating,
    operations: &["judge", "critique", "justify", "defend", "appraise", "recommend"],
    action_contract: "must render a verdict against explicit criteria and defend it",
    forbidden_patterns: &[
        "key factors include",
        "such as",
        "list the",
        "name the",
        "is defined as",
    ],
    answer_hint: "a judgement with its justification",
};

static CREATING: LevelRules = LevelRules {
    level: CognitiveLevel::Creating,
    operations: &[
        "design",
        "construct",
        "formulate",
        "propose",
        "compose",
        "devise",
    ],
    action_contract: "must produce a novel artifact or plan by combining prior elements",
    forbidden_patterns: &[
        "key factors include",
        "such as",
        "list the",
        "name the",
        "which of the following",
    ],
    answer_hint: "an original design, plan, or proposal",
};

/// The rule set for a level.
pub fn rules_for(level: CognitiveLevel) -> &'static LevelRules {
    match level {
        CognitiveLevel::Remembering => &REMEMBERING,
        CognitiveLevel::Understanding => &UNDERSTANDING,
        CognitiveLevel::Applying => &APPLYING,
        CognitiveLevel::Analyzing => &ANALYZING,
        CognitiveLevel::Evaluating => &EVALUATING,
        CognitiveLevel::Creating => &CREATING,
    }
}

/// Check text against a level's forbidden patterns. Returns the first
/// matched pattern, or `None` if the text is clean.
pub fn violated_pattern(level: CognitiveLevel, text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    rules_for(level)
        .forbidden_patterns
        .iter()
        .find(|p| lowered.contains(**p))
        .copied()
}
