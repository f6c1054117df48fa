//! User-facing strings in English and Chinese.

use serde::{Deserialize, Serialize};

#[derive(
    clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Zh,
}

impl Lang {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "zh" => Some(Self::Zh),
            _ => None,
        }
    }

    /// Pick a language from a locale tag such as `zh_CN.UTF-8` or `en-US`.
    pub fn from_locale(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("zh") {
            Self::Zh
        } else {
            Self::En
        }
    }

    /// Detect from `LC_ALL`, `LC_MESSAGES` or `LANG`, in that order.
    pub fn from_env() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.is_empty())
            .map_or(Self::En, |value| Self::from_locale(&value))
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }

    pub const fn strings(self) -> &'static Strings {
        match self {
            Self::En => &EN,
            Self::Zh => &ZH,
        }
    }
}

/// The string table for one language.
#[derive(Debug)]
pub struct Strings {
    pub placeholder: &'static str,
    pub rendering: &'static str,
    pub render_ok: &'static str,
    pub render_error: &'static str,
    pub error_syntax: &'static str,
    error_line: &'static str,
    pub error_tip: &'static str,
    pub error_dismiss: &'static str,
    pub no_diagram: &'static str,
    pub copied_svg: &'static str,
    pub copied_png: &'static str,
    pub downloaded_svg: &'static str,
    pub downloaded_png: &'static str,
    pub link_copied: &'static str,
    pub embed_copied: &'static str,
    pub ai_prompt_copied: &'static str,
    pub failed: &'static str,
    pub look_unsupported: &'static str,
    editor_status: (&'static str, &'static str),
}

impl Strings {
    /// "Line 3" / "第 3 行".
    pub fn error_line(&self, line: usize) -> String {
        self.error_line.replace("{n}", &line.to_string())
    }

    /// "12 lines · 240 chars".
    pub fn editor_status(&self, lines: usize, chars: usize) -> String {
        let (lines_word, chars_word) = self.editor_status;
        format!("{lines} {lines_word} · {chars} {chars_word}")
    }

    /// Prefix a failure detail with the generic failure text.
    pub fn failed_with(&self, detail: impl std::fmt::Display) -> String {
        format!("{}: {detail}", self.failed)
    }
}

static EN: Strings = Strings {
    placeholder: "Type Mermaid code on the left, the diagram renders here in real time",
    rendering: "Rendering...",
    render_ok: "✓ OK",
    render_error: "✗ Error",
    error_syntax: "Syntax Error",
    error_line: "Line {n}",
    error_tip: "Fix the code above and it will re-render automatically",
    error_dismiss: "Dismiss",
    no_diagram: "No diagram to act on",
    copied_svg: "SVG copied",
    copied_png: "PNG copied",
    downloaded_svg: "SVG downloaded",
    downloaded_png: "PNG downloaded",
    link_copied: "Link copied",
    embed_copied: "Embed code copied",
    ai_prompt_copied: "AI prompt copied",
    failed: "Operation failed",
    look_unsupported: "Hand-drawn style is not supported for this diagram type",
    editor_status: ("lines", "chars"),
};

static ZH: Strings = Strings {
    placeholder: "在左侧输入 Mermaid 代码，图表将实时显示在这里",
    rendering: "渲染中...",
    render_ok: "✓ 完成",
    render_error: "✗ 错误",
    error_syntax: "语法错误",
    error_line: "第 {n} 行",
    error_tip: "修复代码后将自动重新渲染",
    error_dismiss: "关闭",
    no_diagram: "没有可操作的图表",
    copied_svg: "SVG 已复制",
    copied_png: "PNG 已复制",
    downloaded_svg: "SVG 已下载",
    downloaded_png: "PNG 已下载",
    link_copied: "链接已复制",
    embed_copied: "嵌入代码已复制",
    ai_prompt_copied: "AI 提示词已复制",
    failed: "操作失败",
    look_unsupported: "此图类型不支持手绘风格",
    editor_status: ("行", "字符"),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_line_template() {
        assert_eq!(Lang::En.strings().error_line(2), "Line 2");
        assert_eq!(Lang::Zh.strings().error_line(12), "第 12 行");
    }

    #[test]
    fn test_locale_detection() {
        assert_eq!(Lang::from_locale("zh_CN.UTF-8"), Lang::Zh);
        assert_eq!(Lang::from_locale("ZH-tw"), Lang::Zh);
        assert_eq!(Lang::from_locale("en_US.UTF-8"), Lang::En);
        assert_eq!(Lang::from_locale(""), Lang::En);
    }

    #[test]
    fn test_editor_status() {
        assert_eq!(Lang::En.strings().editor_status(3, 40), "3 lines · 40 chars");
        assert_eq!(Lang::Zh.strings().editor_status(3, 40), "3 行 · 40 字符");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Lang::parse(" ZH "), Some(Lang::Zh));
        assert_eq!(Lang::parse("fr"), None);
    }
}
