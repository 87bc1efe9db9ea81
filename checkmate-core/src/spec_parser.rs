//! Best-effort extraction of hardware numbers from pasted free text
//! ("Ryzen 7 5800X, 32GB DDR4, RTX 3070 8GB VRAM, Windows 11").
//!
//! The result is a partial [`HardwareInput`]. Anything the text does not
//! state stays `None`; callers must confirm missing values explicitly before
//! the engine runs.

use regex::{Captures, Match, Regex};
use std::sync::LazyLock;

use crate::hardware::{HardwareInput, parse_memory_size};

const SIZE: &str = r"(\d+(?:\.\d+)?)\s*(tb|gb|gib|g|mb|mib)\b";
const GPU_MEMORY: &str =
    r"(?:vram|video\s+memory|graphics\s+memory|gpu\s+memory|dedicated\s+(?:video\s+)?memory)";

fn build(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("hardware text pattern is valid")
}

static VRAM_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    build(&format!(
        r"{SIZE}[ \t]*(?:of[ \t]+)?(?:g?ddr\d\w*[ \t]+|hbm\w*[ \t]+)?{GPU_MEMORY}"
    ))
});
static VRAM_LABEL: LazyLock<Regex> =
    LazyLock::new(|| build(&format!(r"{GPU_MEMORY}\s*[:=]?\s*{SIZE}")));

static SHARED_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    build(&format!(
        r"{SIZE}[ \t]*(?:of[ \t]+)?shared\s+(?:gpu\s+|video\s+|graphics\s+|system\s+)?memory"
    ))
});
static SHARED_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    build(&format!(
        r"shared\s+(?:gpu\s+|video\s+|graphics\s+|system\s+)?memory\s*[:=]?\s*{SIZE}"
    ))
});

static RAM_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    build(&format!(
        r"{SIZE}[ \t]*(?:of[ \t]+)?(?:(?:lp)?ddr\d\w*[ \t]*)?(?:unified\s+memory|system\s+memory|ram\b|memory\b)"
    ))
});
static RAM_DDR: LazyLock<Regex> = LazyLock::new(|| build(&format!(r"{SIZE}[ \t]*(?:lp)?ddr\d")));
static RAM_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    build(&format!(
        r"\b(?:ram|system\s+memory|installed\s+memory|memory)\s*[:=]?\s*{SIZE}"
    ))
});

static GPU_NAMES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?:nvidia\s+)?(?:geforce\s+)?(?:rtx|gtx)\s*\d{3,4}(?:\s*(?:ti|super))*(?:\s+laptop)?",
        r"\b(?:nvidia\s+)?(?:tesla\s+|quadro\s+)?(?:a100|h100|l40s?|a10g?|t4|rtx\s+a\d{4})\b",
        r"\b(?:amd\s+)?radeon\s+(?:rx\s*)?\d{3,4}m?(?:\s*(?:xtx|xt|gre))?",
        r"\bapple\s+m\d(?:\s+(?:pro|max|ultra))?",
        r"\bintel\s+(?:arc\s+a\d{3}m?|iris\s+xe(?:\s+graphics)?|uhd\s+graphics(?:\s+\d+)?)",
    ]
    .iter()
    .map(|p| build(p))
    .collect()
});

static CPU_NAMES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bintel\s+(?:core\s+)?(?:ultra\s+\d\s+\d{3}\w?|i[3579][\s-]?\d{4,5}\w*)",
        r"\b(?:core\s+)?i[3579]-\d{4,5}\w*",
        r"\b(?:amd\s+)?ryzen\s+(?:ai\s+)?\d\s+(?:pro\s+)?\d{3,4}\w*",
        r"\bapple\s+m\d(?:\s+(?:pro|max|ultra))?",
    ]
    .iter()
    .map(|p| build(p))
    .collect()
});

/// "2x", "4 ×", "dual" or "quad" right before a card name.
static GPU_COUNT: LazyLock<Regex> =
    LazyLock::new(|| build(r"(?:\b(\d{1,2})[ \t]*[x×]|\b(dual|quad))[ \t]*$"));
/// A size written right after a card name: "RTX 4090 24GB", "RTX 3070 with 8GB".
static CARD_SIZE: LazyLock<Regex> =
    LazyLock::new(|| build(&format!(r"^[ \t]*(?:\(|-|with[ \t]+)?[ \t]*{SIZE}")));
/// Words after a size that make it system memory rather than the card's.
const NOT_CARD_MEMORY: [&str; 7] = ["ram", "ddr", "lpddr", "system", "unified", "memory", "shared"];

static PLATFORMS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (build(r"\bwindows\b|\bwin\s?1[01]\b"), "win32"),
        (
            build(r"\bmacos\b|\bmac\s+os\b|\bos\s?x\b|\bmacbook\b|\bmac\s+(?:mini|studio|pro)\b"),
            "darwin",
        ),
        (build(r"\blinux\b|\bubuntu\b|\bdebian\b|\bfedora\b|\barch\b|\bmint\b"), "linux"),
    ]
});

fn size_from(caps: &Captures<'_>) -> Option<f64> {
    let value = caps.get(1)?.as_str();
    let unit = caps.get(2)?.as_str();
    parse_memory_size(&format!("{value}{unit}"))
}

/// True when the words right before `start` qualify the match as something
/// other than what the pattern alone suggests ("shared GPU memory: 8 GB").
fn preceded_by(text: &str, start: usize, words: &[&str]) -> bool {
    let before = text[..start].trim_end().to_lowercase();
    words.iter().any(|w| before.ends_with(w))
}

fn first_size(text: &str, patterns: &[&Regex], exclude_before: &[&str]) -> Option<f64> {
    patterns.iter().find_map(|re| {
        re.captures_iter(text).find_map(|caps| {
            let whole = caps.get(0)?;
            if preceded_by(text, whole.start(), exclude_before) {
                return None;
            }
            size_from(&caps)
        })
    })
}

fn first_match<'t>(text: &'t str, patterns: &[Regex]) -> Option<Match<'t>> {
    patterns.iter().find_map(|re| re.find(text))
}

fn normalized(m: Match<'_>) -> String {
    m.as_str().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_apple(name: &str) -> bool {
    name.to_lowercase().starts_with("apple m")
}

/// Number of identical cards announced before the name at `name_start`.
fn gpu_count(text: &str, name_start: usize) -> u32 {
    GPU_COUNT
        .captures(&text[..name_start])
        .and_then(|caps| match (caps.get(1), caps.get(2)) {
            (Some(n), _) => n.as_str().parse().ok(),
            (None, Some(word)) if word.as_str().eq_ignore_ascii_case("dual") => Some(2),
            (None, Some(_)) => Some(4),
            (None, None) => None,
        })
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

/// Per-card memory written directly after the name ending at `name_end`.
fn card_size(text: &str, name_end: usize) -> Option<f64> {
    let rest = &text[name_end..];
    let caps = CARD_SIZE.captures(rest)?;
    let after = rest[caps.get(0)?.end()..].trim_start().to_lowercase();
    if NOT_CARD_MEMORY.iter().any(|w| after.starts_with(w)) {
        return None;
    }
    size_from(&caps)
}

/// Parse free text into whatever hardware fields it states.
///
/// Memory written next to the card name is per card and multiplied by a
/// leading count ("2x RTX 4090 24GB" is 48 GB). A VRAM figure stated
/// elsewhere is taken as the total.
pub fn parse_spec_text(text: &str) -> HardwareInput {
    let gpu = first_match(text, &GPU_NAMES);
    let gpu_name = gpu.map(normalized);
    let cpu_name = first_match(text, &CPU_NAMES).map(normalized);
    let apple = [gpu_name.as_deref(), cpu_name.as_deref()]
        .into_iter()
        .flatten()
        .any(is_apple);

    let per_card = gpu
        .filter(|_| !apple)
        .and_then(|m| Some(card_size(text, m.end())? * f64::from(gpu_count(text, m.start()))));
    let vram_gb =
        per_card.or_else(|| first_size(text, &[&VRAM_LABEL, &VRAM_AFTER], &["shared"]));
    let shared_vram_gb = first_size(text, &[&SHARED_LABEL, &SHARED_AFTER], &[]);
    let ram_gb = first_size(
        text,
        &[&RAM_LABEL, &RAM_AFTER, &RAM_DDR],
        &["video", "graphics", "gpu", "shared", "dedicated"],
    );

    let platform = PLATFORMS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, p)| p.to_string());

    let mut input = HardwareInput {
        ram_gb,
        vram_gb,
        shared_vram_gb,
        vendor: None,
        platform,
        cpu_name,
        gpu_name,
    };

    // Apple silicon has no dedicated VRAM; its GPU borrows system RAM.
    if apple {
        if input.vram_gb.is_none() {
            input.vram_gb = Some(0.0);
        }
        if input.shared_vram_gb.is_none() {
            input.shared_vram_gb = input.ram_gb;
        }
        if input.platform.is_none() {
            input.platform = Some("darwin".to_string());
        }
    }

    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::Vendor;

    #[test]
    fn test_parse_typical_desktop() {
        let input = parse_spec_text(
            "AMD Ryzen 7 5800X, 32GB DDR4 RAM, NVIDIA GeForce RTX 3070 with 8GB VRAM, Windows 11",
        );
        assert_eq!(input.ram_gb, Some(32.0));
        assert_eq!(input.vram_gb, Some(8.0));
        assert_eq!(input.shared_vram_gb, None);
        assert_eq!(input.platform.as_deref(), Some("win32"));
        assert_eq!(input.gpu_name.as_deref(), Some("NVIDIA GeForce RTX 3070"));
        assert_eq!(input.cpu_name.as_deref(), Some("AMD Ryzen 7 5800X"));

        let profile = input.into_profile().unwrap();
        assert_eq!(profile.vendor(), Vendor::Nvidia);
    }

    #[test]
    fn test_parse_task_manager_labels() {
        let text = "Installed memory: 16 GB\nDedicated GPU memory: 6.0 GB\nShared GPU memory: 7.9 GB";
        let input = parse_spec_text(text);
        assert_eq!(input.ram_gb, Some(16.0));
        assert_eq!(input.vram_gb, Some(6.0));
        assert_eq!(input.shared_vram_gb, Some(7.9));
    }

    #[test]
    fn test_vram_is_not_mistaken_for_ram() {
        let input = parse_spec_text("RTX 4060 Laptop, 8 GB VRAM");
        assert_eq!(input.vram_gb, Some(8.0));
        assert_eq!(input.ram_gb, None);
        assert_eq!(input.missing_fields(), vec!["ram_gb"]);
    }

    #[test]
    fn test_apple_silicon_implies_unified_memory() {
        let input = parse_spec_text("MacBook Pro, Apple M2 Max, 64GB unified memory");
        assert_eq!(input.ram_gb, Some(64.0));
        assert_eq!(input.vram_gb, Some(0.0));
        assert_eq!(input.shared_vram_gb, Some(64.0));
        assert_eq!(input.platform.as_deref(), Some("darwin"));

        let profile = input.into_profile().unwrap();
        assert_eq!(profile.vendor(), Vendor::Apple);
    }

    #[test]
    fn test_units_are_converted() {
        let input = parse_spec_text("RAM: 16384 MB, VRAM: 4096MB");
        assert_eq!(input.ram_gb, Some(16.0));
        assert_eq!(input.vram_gb, Some(4.0));
    }

    #[test]
    fn test_unrelated_text_yields_nothing() {
        let input = parse_spec_text("my laptop is pretty fast I think");
        assert_eq!(input, HardwareInput::default());
    }

    #[test]
    fn test_card_count_multiplies_card_memory() {
        let input = parse_spec_text("2x RTX 4090 24GB, 128GB RAM, Ubuntu 22.04");
        assert_eq!(input.vram_gb, Some(48.0));
        assert_eq!(input.ram_gb, Some(128.0));
        assert_eq!(input.gpu_name.as_deref(), Some("RTX 4090"));

        let labelled = parse_spec_text("2x RTX 4090 24GB VRAM, 128GB RAM");
        assert_eq!(labelled.vram_gb, Some(48.0));

        let dual = parse_spec_text("dual RTX 3090 (24 GB), 64GB DDR4");
        assert_eq!(dual.vram_gb, Some(48.0));
        assert_eq!(dual.ram_gb, Some(64.0));
    }

    #[test]
    fn test_bare_card_size_is_vram() {
        let input = parse_spec_text("Intel Core i7-12700K, RTX 3060 12GB, 32GB DDR5");
        assert_eq!(input.vram_gb, Some(12.0));
        assert_eq!(input.ram_gb, Some(32.0));
    }

    #[test]
    fn test_total_vram_elsewhere_is_not_multiplied() {
        let input = parse_spec_text("2x RTX 3090, 48GB VRAM total, 64GB RAM");
        assert_eq!(input.vram_gb, Some(48.0));
    }

    #[test]
    fn test_ram_after_card_name_is_not_vram() {
        let input = parse_spec_text("RTX 3070 32GB RAM");
        assert_eq!(input.vram_gb, None);
        assert_eq!(input.ram_gb, Some(32.0));
    }
}
