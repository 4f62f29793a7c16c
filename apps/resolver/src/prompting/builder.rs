//! Prompt builders. Pure and deterministic: the same inputs always yield the same text.

use serde_json::{json, Map, Value};

use crate::addressing::extract_snippets;
use crate::prompting::prompts::{
    CONTEXT_PREAMBLE, DATE_PROMPT, HINTS_BLOCK, JOB_DETAILS_BLOCK, MULTI_CHOICE_PROMPT,
    NO_OPTIONS_SECTION, QUESTION_HEADER, SCALAR_PROMPT, SCALAR_REQUIRED_RULE,
    SINGLE_CHOICE_PROMPT, SNIPPETS_BLOCK, SYSTEM_PREAMBLE, TEXTAREA_PROMPT,
};
use crate::prompting::{
    JobDetails, PromptChain, PromptStep, Question, QuestionKind, SkippedQuestion, TemplateError,
};

/// Substitutes `{name}` placeholders in a single pass over `template`.
///
/// Substituted text is never scanned again, so user-supplied labels, hints and
/// options can contain anything, placeholder lookalikes included.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = values.iter().find_map(|&(name, value)| {
            tail.strip_prefix(name)
                .and_then(|after| after.strip_prefix('}'))
                .map(|after| (value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Builds the system preamble, embedding the job posting when one is known.
pub fn build_system_prompt(job: &JobDetails) -> String {
    let job_block = if job.has_context() {
        let mut fields = Vec::new();
        if let Some(title) = &job.title {
            fields.push(format!("Job Title:\n{title}"));
        }
        if let Some(description) = &job.description {
            fields.push(format!("Job Description:\n{description}"));
        }
        if let Some(location) = &job.location {
            fields.push(format!("Job Location:\n{location}"));
        }
        fill(JOB_DETAILS_BLOCK, &[("fields", fields.join("\n\n").as_str())])
    } else {
        String::new()
    };

    fill(SYSTEM_PREAMBLE, &[("job_details", job_block.as_str())])
}

/// Builds the context preamble carrying the (already redacted) profile verbatim.
pub fn build_context_prompt(profile: &Value) -> Result<String, TemplateError> {
    let profile_json = serde_json::to_string_pretty(profile)?;
    Ok(fill(CONTEXT_PREAMBLE, &[("profile_json", profile_json.as_str())]))
}

/// Builds the answer prompt for one question, dispatching on its kind.
pub fn build_question_prompt(
    question: &Question,
    snippets: &Map<String, Value>,
) -> Result<String, TemplateError> {
    let kind = question.kind()?;
    let header = build_header(question, snippets)?;

    let prompt = match kind {
        QuestionKind::Scalar => {
            let required_rule = if question.required {
                SCALAR_REQUIRED_RULE
            } else {
                ""
            };
            fill(
                SCALAR_PROMPT,
                &[("header", header.as_str()), ("required_rule", required_rule)],
            )
        }
        QuestionKind::Textarea => fill(TEXTAREA_PROMPT, &[("header", header.as_str())]),
        QuestionKind::SingleChoice => fill(
            SINGLE_CHOICE_PROMPT,
            &[
                ("header", header.as_str()),
                ("options_json", serde_json::to_string_pretty(&question.options)?.as_str()),
                ("options_json_inline", serde_json::to_string(&question.options)?.as_str()),
            ],
        ),
        QuestionKind::MultiChoice => build_multi_choice(question, &header)?,
        QuestionKind::Date => {
            let (missing_rule, value_type) = if question.required {
                ("return today's date", r#""string""#)
            } else {
                ("the value must be null", r#"["string", "null"]"#)
            };
            fill(
                DATE_PROMPT,
                &[
                    ("header", header.as_str()),
                    ("missing_rule", missing_rule),
                    ("value_type", value_type),
                ],
            )
        }
    };

    Ok(prompt)
}

/// Builds the ordered chain for one attempt.
///
/// Preambles (when requested) come first as context-only steps. Each question
/// then contributes one answer step, in order. A question with an unsupported
/// type is reported in `skipped` and contributes no step.
pub fn build_chain(
    profile: &Value,
    job: &JobDetails,
    questions: &[Question],
    include_system: bool,
    include_context: bool,
) -> Result<PromptChain, TemplateError> {
    let mut chain = PromptChain::default();

    if include_system {
        chain.steps.push(PromptStep::context(build_system_prompt(job)));
    }
    if include_context {
        chain
            .steps
            .push(PromptStep::context(build_context_prompt(profile)?));
    }

    for (index, question) in questions.iter().enumerate() {
        let snippets = extract_snippets(profile, &question.relevant_paths);
        match build_question_prompt(question, &snippets) {
            Ok(text) => chain.steps.push(PromptStep::answer(text)),
            Err(TemplateError::UnsupportedQuestionType(error)) => {
                chain.skipped.push(SkippedQuestion { index, error });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(chain)
}

fn build_header(question: &Question, snippets: &Map<String, Value>) -> Result<String, TemplateError> {
    let hints = if question.hints.is_empty() {
        String::new()
    } else {
        fill(
            HINTS_BLOCK,
            &[("hints_json", serde_json::to_string_pretty(&question.hints)?.as_str())],
        )
    };

    let snippets = if snippets.is_empty() {
        String::new()
    } else {
        fill(
            SNIPPETS_BLOCK,
            &[("snippets_json", serde_json::to_string_pretty(snippets)?.as_str())],
        )
    };

    Ok(fill(
        QUESTION_HEADER,
        &[
            ("label", question.label_text.as_str()),
            ("hints", hints.as_str()),
            ("snippets", snippets.as_str()),
        ],
    ))
}

fn build_multi_choice(question: &Question, header: &str) -> Result<String, TemplateError> {
    let has_options = !question.options.is_empty();

    let options_section = if has_options {
        format!(
            "Options:\n{}",
            serde_json::to_string_pretty(&question.options)?
        )
    } else {
        NO_OPTIONS_SECTION.to_string()
    };

    let items_schema = if has_options {
        json!({"type": "string", "enum": question.options})
    } else {
        json!({"type": "string"})
    };

    let (cardinality, empty_rule) = if question.required {
        ("ONE", "Return at least one value in the array")
    } else {
        ("ZERO", "If none apply, return an empty array")
    };

    let membership_rule = if has_options {
        "Every value must exist in the options list"
    } else {
        "Values may be inferred since no options are provided"
    };

    Ok(fill(
        MULTI_CHOICE_PROMPT,
        &[
            ("header", header),
            ("options_section", options_section.as_str()),
            ("cardinality", cardinality),
            ("membership_rule", membership_rule),
            ("empty_rule", empty_rule),
            ("items_schema", serde_json::to_string(&items_schema)?.as_str()),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompting::{PREAMBLE_TIMEOUT, QUESTION_TIMEOUT};

    fn question(id: &str, input_type: &str) -> Question {
        Question {
            id: id.to_string(),
            label_text: format!("Label for {id}"),
            input_type: input_type.to_string(),
            required: true,
            options: vec![],
            hints: vec![],
            relevant_paths: vec![],
        }
    }

    fn profile() -> Value {
        json!({
            "firstName": "Kalp",
            "email": "kalp@example.com",
            "skills": ["Python", "Machine Learning", "React"]
        })
    }

    #[test]
    fn test_system_prompt_priority_order() {
        let prompt = build_system_prompt(&JobDetails::default());
        let legal = prompt.find("Legal and compliance").unwrap();
        let eligibility = prompt.find("Job eligibility").unwrap();
        let alignment = prompt.find("Job alignment").unwrap();
        let profile = prompt.find("Profile database truth").unwrap();
        let hints = prompt.find("Hints and inferred signals").unwrap();
        assert!(legal < eligibility && eligibility < alignment);
        assert!(alignment < profile && profile < hints);
        assert!(prompt.contains("Do not respond to this message"));
        assert!(!prompt.contains("JOB DETAILS"));
        assert!(!prompt.contains("{job_details}"));
    }

    #[test]
    fn test_system_prompt_embeds_job_details() {
        let job = JobDetails {
            title: Some("Full-Stack Developer".to_string()),
            location: Some("Orlando, FL".to_string()),
            ..Default::default()
        };
        let prompt = build_system_prompt(&job);
        assert!(prompt.contains("=== JOB DETAILS ==="));
        assert!(prompt.contains("Job Title:\nFull-Stack Developer"));
        assert!(prompt.contains("Job Location:\nOrlando, FL"));
        assert!(!prompt.contains("Job Description:"));
    }

    #[test]
    fn test_context_prompt_serializes_profile() {
        let prompt = build_context_prompt(&profile()).unwrap();
        assert!(prompt.contains("\"firstName\": \"Kalp\""));
        assert!(prompt.contains("Do not respond to this message"));
    }

    #[test]
    fn test_scalar_prompt_required_rule() {
        let mut q = question("q1", "email");
        let required = build_question_prompt(&q, &Map::new()).unwrap();
        assert!(required.contains("REQUIRED"));
        assert!(required.contains(r#""value": { "type": "string" }"#));

        q.required = false;
        let optional = build_question_prompt(&q, &Map::new()).unwrap();
        assert!(!optional.contains("REQUIRED"));
    }

    #[test]
    fn test_header_includes_hints_and_snippets_only_when_present() {
        let mut q = question("q4", "textarea");
        let bare = build_question_prompt(&q, &Map::new()).unwrap();
        assert!(bare.contains("Label for q4"));
        assert!(!bare.contains("Hints"));
        assert!(!bare.contains("Database excerpts"));

        q.hints = vec!["I got research experience".to_string()];
        let mut snippets = Map::new();
        snippets.insert("firstName".to_string(), json!("Kalp"));
        let full = build_question_prompt(&q, &snippets).unwrap();
        assert!(full.contains("I got research experience"));
        assert!(full.contains("\"firstName\": \"Kalp\""));
        assert!(full.contains("150 words"));
    }

    #[test]
    fn test_label_placeholders_are_not_substituted() {
        let mut q = question("q1", "text");
        q.label_text = "Describe {required_rule} and {options_json}".to_string();
        let prompt = build_question_prompt(&q, &Map::new()).unwrap();
        assert!(prompt.contains("Describe {required_rule} and {options_json}"));
    }

    #[test]
    fn test_single_choice_lists_options_exactly() {
        let mut q = question("q3", "select");
        q.options = vec!["Python".to_string(), "Java".to_string(), "C++".to_string()];
        let prompt = build_question_prompt(&q, &Map::new()).unwrap();
        assert!(prompt.contains(r#""enum": ["Python","Java","C++"]"#));
        assert!(prompt.contains("case-sensitive"));
        assert!(!prompt.contains("{options_json"));
    }

    #[test]
    fn test_multi_choice_with_and_without_options() {
        let mut q = question("q5", "checkbox");
        q.options = vec!["Remote".to_string(), "Hybrid".to_string()];
        let with = build_question_prompt(&q, &Map::new()).unwrap();
        assert!(with.contains("Choose ONE OR MORE"));
        assert!(with.contains("Every value must exist in the options list"));
        assert!(with.contains(r#""items": {"type":"string","enum":["Remote","Hybrid"]}"#));

        q.options.clear();
        q.required = false;
        let without = build_question_prompt(&q, &Map::new()).unwrap();
        assert!(without.contains("Choose ZERO OR MORE"));
        assert!(without.contains("No predefined options exist"));
        assert!(without.contains("return an empty array"));
        assert!(without.contains(r#""items": {"type":"string"}"#));
    }

    #[test]
    fn test_date_prompt_nullability_follows_required() {
        let mut q = question("q6", "date");
        let required = build_question_prompt(&q, &Map::new()).unwrap();
        assert!(required.contains("return today's date"));
        assert!(required.contains(r#""type": "string""#));

        q.required = false;
        let optional = build_question_prompt(&q, &Map::new()).unwrap();
        assert!(optional.contains("the value must be null"));
        assert!(optional.contains(r#"["string", "null"]"#));
    }

    #[test]
    fn test_unsupported_type_is_an_error_for_single_prompt() {
        let q = question("q9", "file");
        let err = build_question_prompt(&q, &Map::new()).unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedQuestionType(ref e) if e.0 == "file"));
    }

    #[test]
    fn test_chain_with_preambles() {
        let questions = vec![question("q1", "text"), question("q2", "date")];
        let chain = build_chain(&profile(), &JobDetails::default(), &questions, true, true).unwrap();

        assert_eq!(chain.steps.len(), 4);
        assert!(!chain.steps[0].copy_output);
        assert!(!chain.steps[1].copy_output);
        assert_eq!(chain.steps[0].timeout, PREAMBLE_TIMEOUT);
        assert!(chain.steps[2..].iter().all(|s| s.copy_output && s.strip_punctuation));
        assert!(chain.steps[2..].iter().all(|s| s.timeout == QUESTION_TIMEOUT));
        assert!(chain.steps[2].text.contains("Label for q1"));
        assert!(chain.steps[3].text.contains("Label for q2"));
        assert_eq!(chain.answer_count(), 2);
    }

    #[test]
    fn test_chain_without_preambles() {
        let questions = vec![question("q1", "text")];
        let chain =
            build_chain(&profile(), &JobDetails::default(), &questions, false, false).unwrap();
        assert_eq!(chain.steps.len(), 1);
        assert!(chain.steps[0].copy_output);
    }

    #[test]
    fn test_chain_skips_only_the_unsupported_question() {
        let questions = vec![
            question("q1", "text"),
            question("q2", "file"),
            question("q3", "textarea"),
        ];
        let chain =
            build_chain(&profile(), &JobDetails::default(), &questions, false, false).unwrap();
        assert_eq!(chain.answer_count(), 2);
        assert_eq!(chain.skipped.len(), 1);
        assert_eq!(chain.skipped[0].index, 1);
        assert_eq!(chain.skipped[0].error.0, "file");
        assert!(chain.steps[1].text.contains("Label for q3"));
    }

    #[test]
    fn test_chain_extracts_relevant_snippets() {
        let mut q = question("q1", "text");
        q.relevant_paths = vec!["firstName".to_string(), "nickname".to_string()];
        let chain = build_chain(&profile(), &JobDetails::default(), &[q], false, false).unwrap();
        let text = &chain.steps[0].text;
        assert!(text.contains("\"firstName\": \"Kalp\""));
        assert!(!text.contains("nickname"));
        assert!(!text.contains("kalp@example.com"));
    }

    #[test]
    fn test_chain_is_deterministic() {
        let questions = vec![question("q1", "radio"), question("q2", "multiselect")];
        let job = JobDetails {
            description: Some("Build web apps".to_string()),
            ..Default::default()
        };
        let a = build_chain(&profile(), &job, &questions, true, true).unwrap();
        let b = build_chain(&profile(), &job, &questions, true, true).unwrap();
        assert_eq!(a.steps, b.steps);
    }

    #[test]
    fn test_fill_does_not_rescan_substituted_text() {
        let out = fill("{a}-{b}", &[("a", "{b}"), ("b", "x")]);
        assert_eq!(out, "{b}-x");
    }

    #[test]
    fn test_fill_leaves_unknown_braces_alone() {
        let out = fill(r#"{ "k": {v} } \d{4} {"#, &[("v", "1")]);
        assert_eq!(out, r#"{ "k": 1 } \d{4} {"#);
    }

    #[test]
    fn test_user_text_with_placeholder_lookalikes_survives() {
        let mut q = question("q1", "checkbox");
        q.label_text = "Describe {hints} usage".to_string();
        q.hints = vec!["see {label}".to_string()];
        q.options = vec!["{cardinality}".to_string(), "{items_schema}".to_string()];

        let prompt = build_question_prompt(&q, &Map::new()).unwrap();

        assert!(prompt.contains("Describe {hints} usage"));
        assert!(prompt.contains("see {label}"));
        assert!(prompt.contains("\"{cardinality}\""));
        assert!(prompt.contains("\"{items_schema}\""));
        assert!(prompt.contains("Choose ONE OR MORE values."));
    }

    #[test]
    fn test_job_details_with_braces_are_kept_verbatim() {
        let job = JobDetails {
            title: Some("Engineer {job_details}".to_string()),
            ..JobDetails::default()
        };
        assert!(build_system_prompt(&job).contains("Engineer {job_details}"));
    }
}
