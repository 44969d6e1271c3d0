//! Prompt templating.
//!
//! Templates are plain text with fixed `{{name}}` placeholders replaced
//! literally; there is no expression language.

use crate::collector::ThreadSnapshot;

pub const TITLE_PLACEHOLDER: &str = "{{title}}";
pub const SCANNED_PAGES_PLACEHOLDER: &str = "{{scannedPages}}";
pub const TOTAL_PAGES_PLACEHOLDER: &str = "{{totalPages}}";
pub const POST_COUNT_PLACEHOLDER: &str = "{{postCount}}";
pub const POSTS_PLACEHOLDER: &str = "{{posts}}";

/// Every placeholder [`render`] substitutes.
pub const PLACEHOLDERS: [&str; 5] = [
    TITLE_PLACEHOLDER,
    SCANNED_PAGES_PLACEHOLDER,
    TOTAL_PAGES_PLACEHOLDER,
    POST_COUNT_PLACEHOLDER,
    POSTS_PLACEHOLDER,
];

/// Built-in instruction used when no template is configured.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
你是專業論壇內容分析助理。請用繁體中文整理以下 Mobile01 討論串內容。
在整理前，請先判斷每則貼文是否有明顯網軍帶風向、業配、行銷廣告、洗文或不自然推銷傾向。
若判定為可疑，請將該則內容從共識與結論中排除，不要把它當作有效建議。
判斷請保守且以內容線索為主，避免無根據指控。
輸出格式：
1) 三行摘要
2) 主要共識（條列）
3) 爭議與不同觀點（條列）
4) 給讀者的結論建議（條列，需排除可疑網軍/廣告內容）
5) 可疑網軍/行銷內容觀察（條列：寫出可疑特徵與貼文編號；若無則寫「未發現明顯可疑內容」）

討論串標題: {{title}}
抓取頁數: {{scannedPages}}/{{totalPages}}
貼文數: {{postCount}}

以下是貼文內容：
{{posts}}";

/// Number the posts (`[1] ...`) and separate them with a blank line.
pub fn join_posts(posts: &[String]) -> String {
    posts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[{}] {}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The template to use: `template` unless it is blank.
pub fn effective_template(template: &str) -> &str {
    let trimmed = template.trim();
    if trimmed.is_empty() {
        DEFAULT_PROMPT_TEMPLATE
    } else {
        trimmed
    }
}

/// Fill `template` (or the default, if blank) with thread data.
pub fn render(template: &str, snapshot: &ThreadSnapshot, joined_posts: &str) -> String {
    let replacements = [
        (TITLE_PLACEHOLDER, snapshot.title.clone()),
        (SCANNED_PAGES_PLACEHOLDER, snapshot.scanned_pages.to_string()),
        (TOTAL_PAGES_PLACEHOLDER, snapshot.total_pages.to_string()),
        (POST_COUNT_PLACEHOLDER, snapshot.posts.len().to_string()),
        (POSTS_PLACEHOLDER, joined_posts.to_string()),
    ];

    replacements
        .iter()
        .fold(effective_template(template).to_string(), |output, (token, value)| {
            output.replace(token, value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ThreadSnapshot {
        ThreadSnapshot {
            title: "Phone battery discussion".into(),
            total_pages: 5,
            scanned_pages: 3,
            posts: vec!["first post".into(), "second post".into()],
            truncated: true,
        }
    }

    #[test]
    fn test_join_posts() {
        let posts = vec!["alpha".to_string(), "beta".to_string()];
        assert_eq!(join_posts(&posts), "[1] alpha\n\n[2] beta");
        assert_eq!(join_posts(&[]), "");
    }

    #[test]
    fn test_render_custom_template() {
        let snap = snapshot();
        let joined = join_posts(&snap.posts);
        let out = render(
            "{{title}} ({{scannedPages}}/{{totalPages}}, {{postCount}} posts)\n{{posts}}",
            &snap,
            &joined,
        );
        assert_eq!(
            out,
            "Phone battery discussion (3/5, 2 posts)\n[1] first post\n\n[2] second post"
        );
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let snap = snapshot();
        let out = render("{{title}} | {{title}} | {{postCount}}{{postCount}}", &snap, "");
        assert_eq!(out, "Phone battery discussion | Phone battery discussion | 22");
    }

    #[test]
    fn test_blank_template_uses_default() {
        let snap = snapshot();
        let joined = join_posts(&snap.posts);
        let expected = render(DEFAULT_PROMPT_TEMPLATE, &snap, &joined);

        assert_eq!(render("", &snap, &joined), expected);
        assert_eq!(render("  \n\t ", &snap, &joined), expected);
        assert!(expected.contains("抓取頁數: 3/5"));
    }

    #[test]
    fn test_no_placeholders_survive() {
        let snap = snapshot();
        let template = PLACEHOLDERS.join(" ");
        let out = render(&template, &snap, &join_posts(&snap.posts));
        for token in PLACEHOLDERS {
            assert!(!out.contains(token), "{token} left in output");
        }
        assert!(!render("", &snap, "").contains("{{"));
    }

    #[test]
    fn test_unknown_tokens_left_alone() {
        let out = render("{{author}} {{title}}", &snapshot(), "");
        assert_eq!(out, "{{author}} Phone battery discussion");
    }
}
