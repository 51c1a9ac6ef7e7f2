//! Prompt templates for query expansion, learning extraction and summaries.

/// Appended to a prompt when the first answer could not be parsed.
pub const STRUCTURE_REMINDER: &str = "Please ensure your response is clear and structured. \
Each point should be on a new line and be a complete, meaningful statement.";

/// Built-in research system prompt, used when no prompt store supplies one.
pub fn default_system_prompt() -> &'static str {
    r#"You are CORE AI, a research analyst producing exhaustive, well-sourced analyses across every field of knowledge.

[PRIMARY OBJECTIVES]
1. Comprehensive exploration: cover historical context, current applications and recent developments.
2. Analytical depth: break concepts into components, map how they relate, and compare against neighbouring theories.
3. Meta-analysis: assess research methodologies, point out knowledge gaps and propose directions for further inquiry.

[VALIDATION]
- Corroborate claims with reputable, diverse sources.
- Keep findings consistent with established domain knowledge.
- Keep the reasoning coherent from start to finish.

[RELIABILITY ORDER]
1. Empirical evidence from experiments and measurements.
2. Peer-reviewed publications.
3. Expert consensus.

[FORMAT]
- Use clear headings and bullet points.
- Cite in APA style.
- Be direct: no introductions or filler."#
}

/// Ask for follow-up research questions about `query`, seeded with what is already known.
pub fn query_expansion_prompt(query: &str, learnings: &[String]) -> String {
    let knowledge = if learnings.is_empty() {
        String::new()
    } else {
        format!("[EXISTING KNOWLEDGE BASE]\n• {}\n", learnings.join("\n• "))
    };

    format!(
        r#"Expand the research scope for: "{query}"

{knowledge}
[RESEARCH PARAMETERS]
1. Component breakdown: identify the fundamental components or aspects of the topic.
2. Impact assessment: analyze immediate and long-term implications.
3. Mechanisms: investigate underlying mechanisms, causal relationships and dependencies.

[QUESTION GUIDELINES]
- Cover technical, historical, ethical and practical angles.
- Keep each question specific and focused on one aspect.
- Start every question with What, How, Why, When, Where or Which.

[EXAMPLES]
- What are the foundational principles underlying this concept?
- How has the application of this idea evolved over time?
- Which factors have most influenced changes in this domain?

[OUTPUT]
List each question on its own line with no additional commentary."#
    )
}

/// Ask for learnings and follow-up questions from a batch of search content.
pub fn extraction_prompt(query: &str, contents: &[String], num_learnings: usize, num_follow_ups: usize) -> String {
    let content = contents
        .iter()
        .map(|text| format!("---\n{}\n---", text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze the following content about "{query}":

Content:
{content}

Extract:
1. Key Learnings (at least {num_learnings}):
   - Focus on specific facts, data points and relationships
   - Each learning must be a complete, meaningful statement
   - Include technical details when available
   - Avoid generic or obvious statements

2. Follow-up Questions (at least {num_follow_ups}):
   - Explore aspects the content does not fully cover
   - Start each question with What, How, Why, When, Where or Which
   - Be specific and detailed

Format your response with clear sections for "Key Learnings:" and "Follow-up Questions:""#
    )
}

/// Ask for a narrative summary of the collected learnings.
pub fn summary_prompt(query: &str, learnings: &[String]) -> String {
    let findings = learnings
        .iter()
        .enumerate()
        .map(|(i, l)| format!("{}. {}", i + 1, l))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Write a comprehensive narrative summary about {query} based on these key findings:

{findings}

Requirements:
1. Write in a clear, engaging style
2. Organize information logically
3. Connect related concepts
4. Highlight key relationships and implications
5. Maintain technical accuracy
6. Break into paragraphs for readability

Do not include introductory text like "Here's a summary". Write the narrative directly."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_expansion_embeds_learnings() {
        let prompt = query_expansion_prompt("quantum computing", &["Qubits decohere".to_string()]);
        assert!(prompt.contains("\"quantum computing\""));
        assert!(prompt.contains("[EXISTING KNOWLEDGE BASE]\n• Qubits decohere"));

        let bare = query_expansion_prompt("quantum computing", &[]);
        assert!(!bare.contains("EXISTING KNOWLEDGE BASE"));
    }

    #[test]
    fn test_extraction_prompt_delimits_content() {
        let prompt = extraction_prompt("rust", &["one".into(), "two".into()], 3, 2);
        assert!(prompt.contains("---\none\n---\n---\ntwo\n---"));
        assert!(prompt.contains("Key Learnings (at least 3)"));
        assert!(prompt.contains("Follow-up Questions (at least 2)"));
    }

    #[test]
    fn test_summary_prompt_numbers_findings() {
        let prompt = summary_prompt("rust", &["a".into(), "b".into()]);
        assert!(prompt.contains("1. a\n2. b"));
    }

    #[test]
    fn test_default_system_prompt_not_empty() {
        assert!(default_system_prompt().contains("research"));
    }
}
