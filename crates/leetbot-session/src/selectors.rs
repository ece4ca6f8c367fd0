//! The DOM contract surface against leetcode.com: class names, button
//! labels and data-path attributes, plus the JS snippets built from them.
//! These are versioned by the site, not by us — when the site ships a new
//! frontend this is the file that breaks.

pub const BASE_URL: &str = "https://leetcode.com";
pub const LOGIN_URL: &str = "https://leetcode.com/accounts/login/";
pub const PROBLEMSET_URL: &str = "https://leetcode.com/problemset/all/";
pub const GRAPHQL_URL: &str = "https://leetcode.com/graphql";

/// Problem statement container.
pub const PROBLEM_STATEMENT: &str = ".elfjS";
/// Monaco's rendered code lines (starter template scrape).
pub const EDITOR_LINES: &str = ".view-lines";
/// Monaco's hidden textarea; the insertion target.
pub const EDITOR_INPUT: &str = ".inputarea";
/// Result panel after a test run.
pub const TEST_RESULT_PANEL: &str = r#"div[data-layout-path="/c1/ts1/t1"]"#;
/// Result panel after a submission.
pub const SUBMIT_RESULT_PANEL: &str = r#"div[data-layout-path="/ts0/t1"]"#;
/// Present only when logged in; the authentication indicator.
pub const NAVBAR_AVATAR: &str = r#"span[id*="navbar_user_avatar"]"#;
pub const LOGIN_EMAIL: &str = "#id_login";
pub const LOGIN_PASSWORD: &str = "#id_password";
/// The language dropdown once the switcher button is clicked.
pub const LANGUAGE_DROPDOWN: &str = r#"div[class*="p-2 rounded-lg"]"#;

/// Quote a Rust string as a JS string literal (JSON escaping is valid JS).
pub fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Boolean expression: element exists.
pub fn present_expr(selector: &str) -> String {
    format!("!!document.querySelector({})", js_string(selector))
}

/// Expression yielding the element's innerText, or null when absent.
pub fn inner_text_expr(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); return el ? el.innerText : null; }})()",
        js_string(selector)
    )
}

/// Click the first button whose visible text contains `label`. Returns
/// whether a button was found. Buttons are located by text because the
/// site's button class names are hashed.
pub fn click_button_expr(label: &str) -> String {
    format!(
        "(() => {{ const b = Array.from(document.querySelectorAll('button')).find(b => b.textContent.includes({label})); if (!b) return false; b.click(); return true; }})()",
        label = js_string(label)
    )
}

/// Boolean expression: a button with `label` in its text exists.
pub fn button_present_expr(label: &str) -> String {
    format!(
        "Array.from(document.querySelectorAll('button')).some(b => b.textContent.includes({}))",
        js_string(label)
    )
}

/// Fill an input through the native value setter so React sees the change.
pub fn fill_input_expr(selector: &str, value: &str) -> String {
    format!(
        r#"(() => {{
  const input = document.querySelector({sel});
  if (!input) return false;
  const setter = Object.getOwnPropertyDescriptor(window.HTMLInputElement.prototype, 'value').set;
  setter.call(input, {val});
  input.dispatchEvent(new Event('input', {{bubbles: true}}));
  input.dispatchEvent(new Event('change', {{bubbles: true}}));
  return true;
}})()"#,
        sel = js_string(selector),
        val = js_string(value)
    )
}

/// Focus the Monaco input textarea. Returns whether it was found.
pub fn focus_editor_expr() -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); if (!el) return false; el.focus(); return true; }})()",
        js_string(EDITOR_INPUT)
    )
}

/// Click the editor language-switcher button, whatever language it
/// currently shows. Returns whether it was found.
pub fn click_language_switcher_expr(known_labels: &[&str]) -> String {
    let labels = serde_json::Value::from(
        known_labels
            .iter()
            .map(|l| serde_json::Value::from(*l))
            .collect::<Vec<_>>(),
    );
    format!(
        r#"(() => {{
  const labels = {labels};
  const b = Array.from(document.querySelectorAll('button'))
    .find(b => b.className.includes('rounded') && labels.some(l => b.textContent.includes(l)));
  if (!b) return false;
  b.click();
  return true;
}})()"#,
        labels = labels
    )
}

/// Click the dropdown entry for `label`. Returns whether it was found.
pub fn click_language_option_expr(label: &str) -> String {
    format!(
        r#"(() => {{
  const opt = Array.from(document.querySelectorAll('div'))
    .find(d => d.className.includes('group') && d.textContent.trim() === {label});
  if (!opt) return false;
  opt.click();
  return true;
}})()"#,
        label = js_string(label)
    )
}

/// Boolean expression: the language switcher now shows `label`.
pub fn language_selected_expr(label: &str) -> String {
    format!(
        "Array.from(document.querySelectorAll('button')).some(b => b.className.includes('rounded') && b.textContent.includes({}))",
        js_string(label)
    )
}

/// In-page GraphQL fetch for the daily challenge, so the request carries
/// the session's cookies and referer. Resolves to a JSON string.
pub fn daily_question_expr() -> String {
    format!(
        r#"(async () => {{
  const query = {{
    query: `query questionOfToday {{
      activeDailyCodingChallengeQuestion {{
        link
        question {{
          title
          titleSlug
        }}
      }}
    }}`
  }};
  try {{
    const resp = await fetch({url}, {{
      method: 'POST',
      headers: {{ 'Content-Type': 'application/json', 'Referer': {referer} }},
      body: JSON.stringify(query)
    }});
    const data = await resp.json();
    const q = data.data.activeDailyCodingChallengeQuestion;
    return JSON.stringify({{ link: q.link, title: q.question.title, slug: q.question.titleSlug }});
  }} catch (e) {{
    return JSON.stringify({{ error: String(e) }});
  }}
}})()"#,
        url = js_string(GRAPHQL_URL),
        referer = js_string("https://leetcode.com/")
    )
}
