//! Prompts sent to the vision model
//!
//! Each prompt has an instruction block placed before the image and a short
//! question placed after it.

/// Instruction and question framing one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt {
    /// Text sent before the image
    pub instructions: &'static str,
    /// Text sent after the image
    pub question: &'static str,
}

/// Ask for the name of the tool a troubleshooting manual covers
///
/// The image shows the first pages of the manual.
pub const TOOL_NAME: Prompt = Prompt {
    instructions: r#"You will be shown the opening pages of a troubleshooting manual. Identify the tool the manual is written for.
The tool name normally appears near the start, in a title of the form "XXXXX Troubleshooting Procedures", where XXXXX is the tool name.
Answer with the tool name alone and no other text."#,
    question: "Which tool is this manual for?\n\n",
};

/// Ask for detailed descriptions of the diagrams in a section
///
/// The image shows every page of one section.
pub const DIAGRAMS: Prompt = Prompt {
    instructions: r#"You explain technical instructions. The pages shown mix text with images.
Treat every image as a diagram and explain it fully in plain language:
- If a diagram contains instructions, give those instructions.
- If an image is a table, explain what the table contains.
- Describe each diagram completely, never just part of it.
Start each description by saying which image it refers to, and when there are several images describe all of them.
If the pages contain no images at all, reply only with:
This document does not contain any diagrams."#,
    question: "Your answer:\n\n",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_are_distinct_and_non_empty() {
        for prompt in [TOOL_NAME, DIAGRAMS] {
            assert!(!prompt.instructions.trim().is_empty());
            assert!(!prompt.question.trim().is_empty());
        }
        assert_ne!(TOOL_NAME, DIAGRAMS);
    }

    #[test]
    fn test_diagram_prompt_names_the_no_diagram_reply() {
        assert!(DIAGRAMS
            .instructions
            .ends_with("This document does not contain any diagrams."));
    }
}
