//! JavaScript 处理模块
//!
//! 压缩只去掉注释和多余空白，不改写语法结构；并识别哪些 `<script type>` 属于可执行的 JavaScript。

use super::css::escape_end_tag;

/// Types under which browsers execute a `<script>` element's text.
const JS_MIME_TYPES: &[&str] = &[
    "application/ecmascript",
    "application/javascript",
    "application/x-ecmascript",
    "application/x-javascript",
    "text/ecmascript",
    "text/javascript",
    "text/javascript1.0",
    "text/javascript1.5",
    "text/jscript",
    "text/livescript",
    "text/x-ecmascript",
    "text/x-javascript",
];

/// 在这些关键字之后出现的 `/` 开始一个正则表达式
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "await",
    "case",
    "delete",
    "do",
    "else",
    "in",
    "instanceof",
    "new",
    "of",
    "return",
    "throw",
    "typeof",
    "void",
    "yield",
];

/// 脚本的执行方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptKind {
    /// 经典脚本
    Classic,
    /// ES 模块
    Module,
    /// 数据块或模板，不执行
    Data,
}

/// 根据 `type` 属性判断脚本类型
pub fn script_kind(type_attr: Option<&str>) -> ScriptKind {
    let Some(value) = type_attr.map(str::trim) else {
        return ScriptKind::Classic;
    };

    if value.is_empty() {
        return ScriptKind::Classic;
    }

    if value.eq_ignore_ascii_case("module") {
        return ScriptKind::Module;
    }

    let essence = value.split(';').next().unwrap_or_default().trim();
    if JS_MIME_TYPES.iter().any(|t| essence.eq_ignore_ascii_case(t)) {
        ScriptKind::Classic
    } else {
        ScriptKind::Data
    }
}

/// Minifies a script body.
///
/// Comments are dropped and whitespace runs collapse. A run containing a line
/// break becomes a single `\n`, so automatic semicolon insertion, directive
/// prologues and declarations read exactly as before. String, template and
/// regular expression literals are copied verbatim. Input the scanner cannot
/// follow (an unterminated literal or comment) is an error.
pub fn minify_js(js: &str, kind: ScriptKind) -> Result<String, String> {
    if kind == ScriptKind::Data {
        return Err("not an executable script".to_string());
    }

    let src: Vec<char> = js.chars().collect();
    let mut out = String::with_capacity(js.len());
    let mut gap = Gap::None;
    let mut i = 0;

    // hashbang
    if src.starts_with(&['#', '!']) {
        while i < src.len() && !is_line_terminator(src[i]) {
            out.push(src[i]);
            i += 1;
        }
    }

    while i < src.len() {
        let c = src[i];

        if is_line_terminator(c) {
            gap = Gap::Newline;
            i += 1;
            continue;
        }
        if is_js_whitespace(c) {
            gap = gap.max(Gap::Space);
            i += 1;
            continue;
        }
        if c == '/' && src.get(i + 1) == Some(&'/') {
            while i < src.len() && !is_line_terminator(src[i]) {
                i += 1;
            }
            gap = gap.max(Gap::Space);
            continue;
        }
        if c == '/' && src.get(i + 1) == Some(&'*') {
            let (end, multiline) = skip_block_comment(&src, i)?;
            gap = gap.max(if multiline { Gap::Newline } else { Gap::Space });
            i = end;
            continue;
        }

        flush_gap(&mut out, gap, c);
        gap = Gap::None;

        i = match c {
            '"' | '\'' => copy_string(&src, i, &mut out)?,
            '`' => copy_template(&src, i, &mut out)?,
            '/' if regex_allowed(&out) => copy_regex(&src, i, &mut out)?,
            _ => {
                out.push(c);
                i + 1
            }
        };
    }

    Ok(out)
}

/// 防止内联脚本中的 `</script` 提前结束元素
pub fn escape_inline_js(js: &str) -> String {
    escape_end_tag(js, "</script")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Gap {
    None,
    Space,
    Newline,
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_js_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{000B}' | '\u{000C}' | '\u{00A0}' | '\u{FEFF}')
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '\\' | '#') || !c.is_ascii()
}

/// 两个字符之间的空白去掉后是否会拼成另一个记号
fn needs_space(prev: char, next: char) -> bool {
    let wordish = |c: char| is_word_char(c) || c == '.';

    (wordish(prev) && wordish(next))
        || (matches!(prev, '+' | '-') && matches!(next, '+' | '-'))
        || (prev == '/' && (matches!(next, '/' | '*') || is_word_char(next)))
        || (prev == '<' && next == '!')
        || (prev == '-' && next == '>')
}

fn flush_gap(out: &mut String, gap: Gap, next: char) {
    let Some(prev) = out.chars().next_back() else {
        return;
    };

    match gap {
        Gap::None => {}
        Gap::Space => {
            if needs_space(prev, next) {
                out.push(' ');
            }
        }
        Gap::Newline => out.push('\n'),
    }
}

/// 根据前一个有效记号判断 `/` 是除号还是正则的开始
fn regex_allowed(out: &str) -> bool {
    let trimmed = out.trim_end();
    let Some(last) = trimmed.chars().next_back() else {
        return true;
    };

    if matches!(last, ')' | ']' | '}' | '"' | '\'' | '`') {
        return false;
    }

    if is_word_char(last) {
        let start = trimmed
            .char_indices()
            .rev()
            .take_while(|&(_, c)| is_word_char(c))
            .last()
            .map_or(trimmed.len(), |(index, _)| index);
        return REGEX_PRECEDING_KEYWORDS.contains(&&trimmed[start..]);
    }

    true
}

fn skip_block_comment(src: &[char], start: usize) -> Result<(usize, bool), String> {
    let mut multiline = false;
    let mut i = start + 2;

    while i + 1 < src.len() {
        if src[i] == '*' && src[i + 1] == '/' {
            return Ok((i + 2, multiline));
        }
        multiline |= is_line_terminator(src[i]);
        i += 1;
    }

    Err("unterminated block comment".to_string())
}

fn copy_string(src: &[char], start: usize, out: &mut String) -> Result<usize, String> {
    let quote = src[start];
    out.push(quote);
    let mut i = start + 1;

    while let Some(&c) = src.get(i) {
        out.push(c);
        i += 1;

        if c == '\\' {
            if let Some(&escaped) = src.get(i) {
                out.push(escaped);
                i += 1;
                if escaped == '\r' && src.get(i) == Some(&'\n') {
                    out.push('\n');
                    i += 1;
                }
            }
        } else if c == quote {
            return Ok(i);
        } else if c == '\n' || c == '\r' {
            break;
        }
    }

    Err("unterminated string literal".to_string())
}

fn copy_template(src: &[char], start: usize, out: &mut String) -> Result<usize, String> {
    out.push('`');
    let mut i = start + 1;

    while let Some(&c) = src.get(i) {
        out.push(c);
        i += 1;

        match c {
            '\\' => {
                if let Some(&escaped) = src.get(i) {
                    out.push(escaped);
                    i += 1;
                }
            }
            '`' => return Ok(i),
            '$' if src.get(i) == Some(&'{') => {
                out.push('{');
                i = copy_substitution(src, i + 1, out)?;
            }
            _ => {}
        }
    }

    Err("unterminated template literal".to_string())
}

/// 原样复制 `${ ... }` 的内容，直到与之匹配的 `}`
fn copy_substitution(src: &[char], start: usize, out: &mut String) -> Result<usize, String> {
    let mut depth = 1usize;
    let mut i = start;

    while let Some(&c) = src.get(i) {
        match c {
            '"' | '\'' => i = copy_string(src, i, out)?,
            '`' => i = copy_template(src, i, out)?,
            _ => {
                out.push(c);
                i += 1;
                if c == '{' {
                    depth += 1;
                } else if c == '}' {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
            }
        }
    }

    Err("unterminated template substitution".to_string())
}

fn copy_regex(src: &[char], start: usize, out: &mut String) -> Result<usize, String> {
    out.push('/');
    let mut i = start + 1;
    let mut in_class = false;

    while let Some(&c) = src.get(i) {
        if is_line_terminator(c) {
            break;
        }
        out.push(c);
        i += 1;

        match c {
            '\\' => match src.get(i) {
                Some(&escaped) if !is_line_terminator(escaped) => {
                    out.push(escaped);
                    i += 1;
                }
                _ => break,
            },
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return Ok(i),
            _ => {}
        }
    }

    Err("unterminated regular expression".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minify(js: &str) -> String {
        minify_js(js, ScriptKind::Classic).unwrap()
    }

    #[test]
    fn detects_script_kinds() {
        assert_eq!(script_kind(None), ScriptKind::Classic);
        assert_eq!(script_kind(Some("")), ScriptKind::Classic);
        assert_eq!(script_kind(Some("text/javascript")), ScriptKind::Classic);
        assert_eq!(script_kind(Some("Application/JavaScript; charset=utf-8")), ScriptKind::Classic);
        assert_eq!(script_kind(Some("module")), ScriptKind::Module);
        assert_eq!(script_kind(Some("application/ld+json")), ScriptKind::Data);
        assert_eq!(script_kind(Some("text/x-template")), ScriptKind::Data);
    }

    #[test]
    fn minifies_valid_javascript() {
        let js = "function greet(name) {\n    // say hello\n    return 'Hello, ' + name;\n}\n";
        let minified = minify(js);

        assert_eq!(minified, "function greet(name){\nreturn'Hello, '+name;\n}");
        assert!(minified.len() < js.len());
    }

    #[test]
    fn keeps_class_accessors_and_private_fields() {
        let js = "class A { #x = 1; static y = 2; get z() { return this.#x; } }";

        assert_eq!(
            minify(js),
            "class A{#x=1;static y=2;get z(){return this.#x;}}"
        );
    }

    #[test]
    fn keeps_directives_and_declarations_in_place() {
        let js = "'use strict';\nfunction f() { undeclared = 1; }";

        assert_eq!(minify(js), "'use strict';\nfunction f(){undeclared=1;}");
    }

    #[test]
    fn accepts_sloppy_mode_function_declarations() {
        assert_eq!(minify("if (a) function f(){}"), "if(a)function f(){}");
        assert_eq!(
            minify_js("if (a) function f(){}", ScriptKind::Module).unwrap(),
            "if(a)function f(){}"
        );
    }

    #[test]
    fn keeps_line_breaks_for_semicolon_insertion() {
        assert_eq!(minify("return\n  value"), "return\nvalue");
        assert_eq!(minify("a = b /* one\ntwo */ c"), "a=b\nc");
    }

    #[test]
    fn keeps_tokens_apart() {
        assert_eq!(minify("a + +b; c - -d"), "a+ +b;c- -d");
        assert_eq!(minify("1 .toString()"), "1 .toString()");
        assert_eq!(minify("x = /re/ instanceof RegExp"), "x=/re/ instanceof RegExp");
    }

    #[test]
    fn copies_literals_verbatim() {
        assert_eq!(
            minify("var re = /a  b'c[/]/g;  x = a / 2 / b;"),
            "var re=/a  b'c[/]/g;x=a/ 2/ b;"
        );
        assert_eq!(
            minify("const t = `a  ${ b + `c  d` }  e`;"),
            "const t=`a  ${ b + `c  d` }  e`;"
        );
        assert_eq!(minify("s = \"a  // b\" ;"), "s=\"a  // b\";");
        assert_eq!(minify("return /  x/.test(s)"), "return/  x/.test(s)");
    }

    #[test]
    fn keeps_hashbang_line() {
        assert_eq!(minify("#!/usr/bin/env node\nlet  a = 1"), "#!/usr/bin/env node\nlet a=1");
    }

    #[test]
    fn rejects_unterminated_input() {
        assert!(minify_js("var s = 'oops;\n", ScriptKind::Classic).is_err());
        assert!(minify_js("a = 1 /* open", ScriptKind::Classic).is_err());
        assert!(minify_js("t = `open ${ x", ScriptKind::Classic).is_err());
        assert!(minify_js("{\"a\": 1}", ScriptKind::Data).is_err());
    }

    #[test]
    fn escapes_closing_script_tags() {
        assert_eq!(
            escape_inline_js("document.write('</script>')"),
            "document.write('<\\/script>')"
        );
    }
}
