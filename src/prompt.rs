//! Prompt assembly
//!
//! Merges retrieved context and the user's question into a single model
//! input by substituting two named placeholders in a template.

pub const CONTEXT_PLACEHOLDER: &str = "{context}";
pub const QUESTION_PLACEHOLDER: &str = "{question}";

/// Generic instructional template used when none is configured
pub const DEFAULT_TEMPLATE: &str = "You are a helpful assistant. Answer the question using the \
context below. If the context does not contain the answer, say so and answer from general \
knowledge.

Context:
{context}

Question: {question}

Answer:";

/// Substitute `{context}` and `{question}` into `template`.
///
/// Only the first occurrence of each placeholder is replaced, and inserted
/// values are never rescanned, so a question containing `{context}` stays
/// literal. A placeholder missing from the template drops its value.
pub fn assemble(template: &str, context: &str, question: &str) -> String {
    let mut slots: Vec<(usize, &str, &str)> = [
        (CONTEXT_PLACEHOLDER, context),
        (QUESTION_PLACEHOLDER, question),
    ]
    .into_iter()
    .filter_map(|(placeholder, value)| {
        template
            .find(placeholder)
            .map(|at| (at, placeholder, value))
    })
    .collect();
    slots.sort_by_key(|(at, _, _)| *at);

    let mut prompt = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;
    let mut offset = 0;
    for (at, placeholder, value) in slots {
        let (before, after) = rest.split_at(at - offset);
        prompt.push_str(before);
        prompt.push_str(value);
        rest = after.strip_prefix(placeholder).unwrap_or(after);
        offset = at + placeholder.len();
    }
    prompt.push_str(rest);
    prompt
}
