//! Storage usage: `vizzy storage`.

use anyhow::Result;
use console::style;

use vizzy::client::GalleryClient;
use vizzy_common::storage::{StorageUsage, UsageLevel, format_bytes};

const BAR_WIDTH: usize = 30;

pub async fn cmd_storage(server_url: &str) -> Result<()> {
    let usage = GalleryClient::new(server_url).storage().await?;
    println!("{}", render(&usage));
    Ok(())
}

fn render(usage: &StorageUsage) -> String {
    let filled = ((usage.bar_percent() / 100.0) * BAR_WIDTH as f64).round() as usize;
    let bar = format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH.saturating_sub(filled))
    );
    let bar = match usage.level {
        UsageLevel::Ok => style(bar).green(),
        UsageLevel::Warning => style(bar).yellow(),
        UsageLevel::Critical => style(bar).red(),
    };
    format!(
        "{} {}%  {} of {}",
        bar,
        usage.percent,
        format_bytes(usage.used),
        format_bytes(usage.limit)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_sizes_and_percent() {
        let out = render(&StorageUsage::new(1536, 1024 * 1024));
        assert!(out.contains("0%"));
        assert!(out.contains("1.5 KB of 1 MB"));
    }

    #[test]
    fn test_render_caps_bar_when_over_quota() {
        let out = render(&StorageUsage::new(2048, 1024));
        assert!(out.contains("200%"));
        assert_eq!(out.matches('█').count(), BAR_WIDTH);
    }
}
