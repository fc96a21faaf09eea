/// "Stuff" prompt: every retrieved chunk goes into a single prompt.
const PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

pub fn build_stuff_prompt<'a, I>(question: &str, contexts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let context = contexts.into_iter().collect::<Vec<_>>().join("\n\n");
    format!("{PREAMBLE}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}
