//! HTML escaping and link markup for user text.

use linkify::{LinkFinder, LinkKind};
use url::Url;

/// Escapes the five characters that matter in HTML text and attributes.
pub fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len() * 2);

    for c in input.chars() {
        // https://cheatsheetseries.owasp.org/cheatsheets/Cross_Site_Scripting_Prevention_Cheat_Sheet.html
        match c {
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }

    output
}

/// True when the URL points at one of our own hosts (or a subdomain).
pub fn is_local_url(url: &str, local_domains: &[String]) -> bool {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    let host = match parsed.host_str() {
        Some(host) => host.to_ascii_lowercase(),
        None => return false,
    };

    local_domains.iter().any(|domain| {
        let domain = domain.trim().to_ascii_lowercase();
        !domain.is_empty() && (host == domain || host.ends_with(&format!(".{}", domain)))
    })
}

/// Characters that end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '\'', '"'];

/// The href for a found link. Bare domains are assumed to be http.
fn href_for(url: &str) -> String {
    if url.contains("://") {
        url.to_owned()
    } else {
        format!("http://{}", url)
    }
}

fn anchor(url: &str, local_domains: &[String]) -> String {
    let href = href_for(url);
    let escaped_href = escape_html(&href);
    let escaped_text = escape_html(url);
    if is_local_url(&href, local_domains) {
        format!("<a href=\"{}\">{}</a>", escaped_href, escaped_text)
    } else {
        format!(
            "<a href=\"{}\" target=\"_blank\" class=\"external\">{}</a>",
            escaped_href, escaped_text
        )
    }
}

/// linkify stops at a `?` or `#` right after a bare host. Carries the link
/// on through the query or fragment up to the next whitespace.
fn extend_through_query(text: &str, end: usize) -> usize {
    let rest = &text[end..];
    if !rest.starts_with(|c: char| c == '?' || c == '#') {
        return end;
    }

    let tail = rest.split(char::is_whitespace).next().unwrap_or_default();
    let tail = tail.trim_end_matches(TRAILING_PUNCTUATION);
    // A lone `?` ends a question.
    if tail.len() <= 1 {
        return end;
    }
    end + tail.len()
}

/// Escapes plain text and turns the URLs in it into anchors, with or without
/// a scheme. Links leaving our own domains open in a new tab.
pub fn linkify_text(text: &str, local_domains: &[String]) -> String {
    let mut finder = LinkFinder::new();
    finder.kinds(&[LinkKind::Url]);
    finder.url_must_have_scheme(false);

    let mut output = String::with_capacity(text.len() * 2);
    let mut last = 0;
    for link in finder.links(text) {
        if link.start() < last {
            continue;
        }
        let end = extend_through_query(text, link.end());
        output.push_str(&escape_html(&text[last..link.start()]));
        output.push_str(&anchor(&text[link.start()..end], local_domains));
        last = end;
    }
    output.push_str(&escape_html(&text[last..]));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> Vec<String> {
        vec!["localhost".to_owned(), "example.ac.uk".to_owned()]
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape_html(r#"<b onclick="x">'&'</b>"#),
            "&lt;b onclick=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/b&gt;"
        );
        assert_eq!(escape_html("héllo"), "héllo");
    }

    #[test]
    fn test_local_hosts() {
        assert!(is_local_url("http://localhost:8080/forums", &local()));
        assert!(is_local_url("https://www.example.ac.uk/", &local()));
        assert!(!is_local_url("https://example.com/", &local()));
        assert!(!is_local_url("https://notexample.ac.uk/", &local()));
        assert!(!is_local_url("not a url", &local()));
    }

    #[test]
    fn test_external_links_open_new_tab() {
        assert_eq!(
            linkify_text("see https://rust-lang.org now", &local()),
            "see <a href=\"https://rust-lang.org\" target=\"_blank\" class=\"external\">https://rust-lang.org</a> now"
        );
    }

    #[test]
    fn test_local_links_stay() {
        assert_eq!(
            linkify_text("http://localhost/live-chat", &local()),
            "<a href=\"http://localhost/live-chat\">http://localhost/live-chat</a>"
        );
    }

    #[test]
    fn test_text_around_links_is_escaped() {
        let html = linkify_text("<script> https://a.io?x=1&y=2", &local());
        assert_eq!(
            html,
            "&lt;script&gt; <a href=\"https://a.io?x=1&amp;y=2\" target=\"_blank\" class=\"external\">https://a.io?x=1&amp;y=2</a>"
        );
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_fragment_after_host_stays_in_link() {
        assert_eq!(
            linkify_text("read https://a.io#intro, then reply", &local()),
            "read <a href=\"https://a.io#intro\" target=\"_blank\" class=\"external\">https://a.io#intro</a>, then reply"
        );
    }

    #[test]
    fn test_question_mark_after_link_is_not_taken() {
        assert_eq!(
            linkify_text("did you see https://a.io?", &local()),
            "did you see <a href=\"https://a.io\" target=\"_blank\" class=\"external\">https://a.io</a>?"
        );
    }

    #[test]
    fn test_links_without_scheme() {
        assert_eq!(
            linkify_text("see www.example.com", &local()),
            "see <a href=\"http://www.example.com\" target=\"_blank\" class=\"external\">www.example.com</a>"
        );
        assert_eq!(
            linkify_text("notes at example.ac.uk/exams", &local()),
            "notes at <a href=\"http://example.ac.uk/exams\">example.ac.uk/exams</a>"
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(linkify_text("Start early. Revise often!", &local()), "Start early. Revise often!");
    }
}
