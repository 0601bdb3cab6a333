use dossier_llm::provider::Message;

const CODE_PERSONA: &str = "You are a senior software engineer specializing in technical \
documentation and code comprehension.";

const COMMIT_PERSONA: &str = "You are an expert programmer, and you are trying to summarize a git diff.";

/// First `cap` characters of `text`, cut on a char boundary.
pub(crate) fn truncate_chars(text: &str, cap: usize) -> &str {
    text.char_indices().nth(cap).map_or(text, |(idx, _)| &text[..idx])
}

pub(crate) fn code_summary_prompt(path: &str, content: &str, cap: usize) -> Vec<Message> {
    let code = truncate_chars(content, cap);
    let body = format!(
        "Task: Generate a precise, professional code file summary for a new developer joining the project.

Summary requirements:
- Purpose: explain the core responsibility and function of this file
- Technical depth: highlight key types, functions or algorithms
- Context: describe how this file fits into the broader project architecture
- Audience: a junior to mid-level developer with basic programming knowledge

Formatting:
- Length: between 75 and 125 words
- Tone: clear, technical and informative, no marketing language

Specific instructions for {path}:
- Identify the primary programming language
- Note significant design patterns or architectural approaches
- Mention critical dependencies or imported libraries
- Explain the file's role in the overall system workflow

Code content:
---
{code}
---

Provide a concise summary that helps a new developer quickly understand this file."
    );
    vec![Message::system(CODE_PERSONA), Message::user(body)]
}

pub(crate) fn commit_diff_prompt(diff: &str) -> Vec<Message> {
    let body = format!(
        "Reminders about the git diff format:
For every file there are a few metadata lines, for example:
```
diff --git a/lib/index.js b/lib/index.js
index aadf691..bfef603 100644
--- a/lib/index.js
+++ b/lib/index.js
```
This means that `lib/index.js` was modified in this commit. This is only an example.
Then there is a specifier for the lines that were modified.
A line starting with `+` means it was added.
A line starting with `-` means it was deleted.
A line starting with neither `+` nor `-` is context and is not part of the change.

EXAMPLE SUMMARY COMMENTS:
```
* Raised the amount of returned recordings from `10` to `100` [packages/server/recordings_api.ts], [packages/server/constants.ts]
* Fixed a typo in the github action name [.github/workflows/gpt-commit-summarizer.yml]
* Moved the `octokit` initialization to a separate file [src/octokit.ts], [src/index.ts]
* Added an OpenAI API for completions [packages/utils/apis/openai.ts]
* Lowered numeric tolerance for the test files
```
Most commits will have fewer comments than this example.
The last comment does not include file names because more than two files were relevant.
Do not include parts of the example in your summary.

Provide a concise bullet-point summary of the changes and do not include the diff text in the summary.

Diff to summarize:
```diff
{diff}
```"
    );
    vec![Message::system(COMMIT_PERSONA), Message::user(body)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundary() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn code_prompt_names_path_and_caps_content() {
        let content = "x".repeat(50);
        let messages = code_summary_prompt("src/lib.rs", &content, 10);
        assert_eq!(messages.len(), 2);
        let user = &messages[1].content;
        assert!(user.contains("src/lib.rs"));
        assert!(user.contains(&"x".repeat(10)));
        assert!(!user.contains(&"x".repeat(11)));
        assert!(user.contains("75 and 125 words"));
    }

    #[test]
    fn commit_prompt_embeds_diff() {
        let messages = commit_diff_prompt("+added line");
        let user = &messages[1].content;
        assert!(user.contains("```diff\n+added line\n```"));
        assert!(user.contains("do not include the diff text"));
    }
}
