use agent::Result;
use agent::crew::{Crew, Process, Role, Task};
use agent::llm::LLM;
use agent::tools::SharedTool;
use std::path::Path;
use std::sync::Arc;

pub const OUTPUT_FILE: &str = "blog-post.md";

const RESEARCHER_BACKSTORY: &str = "As a researcher, you are committed to uncovering the \
latest and most interesting findings in your field. You have a knack for finding hidden \
gems of information and presenting them in an engaging way. Your goal is to illuminate the \
topic at hand, providing insights that are both informative and thought-provoking.";

const WRITER_BACKSTORY: &str = "As a writer, you are dedicated to crafting engaging and \
informative articles. You have a talent for transforming complex ideas into accessible \
language, making them relatable to a wide audience.";

const RESEARCH_EXPECTED_OUTPUT: &str = "A comprehensive 3 paragraphs long report on the topic";

pub fn researcher_goal(topic: &str) -> String {
    format!("Uncover interesting findings about {}", topic)
}

pub fn writer_goal(topic: &str) -> String {
    format!("Write intuitive article about {}", topic)
}

pub fn research_description(topic: &str) -> String {
    format!(
        "Derive key insights about {}. \
         What are the latest trends, technologies, and innovations? \
         Have a balanced view, considering both the positive and negative aspects. \
         Your report should be well-structured and easy to follow.",
        topic
    )
}

pub fn write_description(topic: &str) -> String {
    format!(
        "Compose a detailed and easy to understand article on {}. \
         The article should be engaging and informative, suitable for a general audience. \
         It should be well-structured, with a clear introduction, body, and conclusion. \
         Use markdown formatting for headings, lists, and code snippets where appropriate. \
         The article should be at least 4 paragraphs long and cover the key points from the research report.",
        topic
    )
}

pub fn write_expected_output(topic: &str) -> String {
    format!("A 4 paragraph article on {} formatted as markdown", topic)
}

/// The researcher hands its report to the writer, who writes the article to `output_file`.
pub fn build_crew(
    topic: &str,
    llm: Arc<dyn LLM + Send + Sync>,
    search: SharedTool,
    output_file: &Path,
) -> Result<Crew> {
    let researcher = Role::builder()
        .role("Researcher")
        .goal(researcher_goal(topic))
        .backstory(RESEARCHER_BACKSTORY)
        .tool(search.clone())
        .llm(llm.clone())
        .verbose(true)
        .memory(true)
        .allow_delegation(true)
        .build()?;

    let writer = Role::builder()
        .role("Writer")
        .goal(writer_goal(topic))
        .backstory(WRITER_BACKSTORY)
        .tool(search.clone())
        .llm(llm)
        .verbose(true)
        .memory(true)
        .allow_delegation(false)
        .build()?;

    let research_task = Task::builder()
        .description(research_description(topic))
        .expected_output(RESEARCH_EXPECTED_OUTPUT)
        .tool(search.clone())
        .agent(researcher.clone())
        .build()?;

    let write_task = Task::builder()
        .description(write_description(topic))
        .expected_output(write_expected_output(topic))
        .tool(search)
        .agent(writer.clone())
        .async_execution(false)
        .output_file(output_file)
        .build()?;

    Crew::new(
        vec![researcher, writer],
        vec![research_task, write_task],
        Process::Sequential,
    )
}
