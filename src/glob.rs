use crate::error::Error;
use regex::Regex;

/// Translates a glob pattern into a compiled regex, following the rule
/// from §4.3/§9: `*` becomes `.*`, `?` becomes `.`, a backslash disables
/// the substitution for the character that follows it, and everything
/// else (including `[`/`]`) passes straight through so character classes
/// keep working. The translation itself never escapes regex
/// metacharacters it doesn't recognize; whatever the caller writes
/// beyond `*`/`?`/`\` is handed to the regex engine verbatim.
fn translate(pattern: &str, anchored: bool) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    if anchored {
        out.push('^');
    }
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                } else {
                    out.push('\\');
                }
            }
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push(other),
        }
    }
    if anchored {
        out.push('$');
    }
    out
}

/// A compiled glob pattern, anchored for `KEYS`/`CHANNELS` fullstring
/// matching or unanchored for `PUBLISH`'s pattern fan-out.
pub struct Pattern {
    re: Regex,
}

impl Pattern {
    pub fn compile(pattern: &[u8], anchored: bool) -> Result<Pattern, Error> {
        let text = String::from_utf8_lossy(pattern);
        let re = Regex::new(&translate(&text, anchored)).map_err(|_| Error::InvalidPattern)?;
        Ok(Pattern { re })
    }

    pub fn is_match(&self, subject: &[u8]) -> bool {
        self.re.is_match(&String::from_utf8_lossy(subject))
    }
}
