//! "Stuff" prompt assembly: every retrieved chunk goes into a single prompt.

const PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Build a question-answering prompt from retrieved chunk texts, best match first.
pub fn build_stuff_prompt<S: AsRef<str>>(contexts: &[S], question: &str) -> String {
    let context = contexts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{PREAMBLE}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}
