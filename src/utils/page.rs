use serenity::builder::{CreateEmbed, CreateEmbedFooter, CreateMessage};

use super::Table;

/// Table body split into code-block pages that fit an embed description
pub struct Page {
    pub title: String,
    pub pages: Vec<String>,
    pub current_page: usize,
}

impl Page {
    /// Discord caps embed descriptions at 4096 characters
    pub const MAX_DESCRIPTION: usize = 4000;

    /// Repeat the table header on every page and fill each page with up to
    /// `rows_per_page` rows
    pub fn from_table(title: impl Into<String>, table: &Table, rows_per_page: usize) -> Self {
        let lines = table.lines();
        let (header, body) = lines.split_at(lines.len().min(2));
        let header = header.join("\n");
        let rows_per_page = rows_per_page.max(1);

        let mut pages = Vec::new();
        let mut current = String::new();
        let mut count = 0;

        for line in body {
            let would_overflow =
                current.len() + header.len() + line.len() + 10 > Self::MAX_DESCRIPTION;
            if count > 0 && (count == rows_per_page || would_overflow) {
                pages.push(format!("```\n{}\n{}```", header, current));
                current.clear();
                count = 0;
            }
            current.push_str(line);
            current.push('\n');
            count += 1;
        }
        if count > 0 || pages.is_empty() {
            pages.push(format!("```\n{}\n{}```", header, current));
        }

        Page {
            title: title.into(),
            pages,
            current_page: 0,
        }
    }

    /// Jump to a 1-based page, clamped to the valid range
    pub fn go_to(&mut self, page: usize) {
        self.current_page = page.clamp(1, self.total_pages()) - 1;
    }

    /// Get total number of pages
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Get the current page embed
    pub fn current_embed(&self) -> CreateEmbed {
        let body = self.pages.get(self.current_page).cloned().unwrap_or_default();
        let embed = CreateEmbed::default()
            .title(&self.title)
            .description(body)
            .color(0x00b0f4);

        if self.total_pages() > 1 {
            embed.footer(CreateEmbedFooter::new(format!(
                "Page {}/{}",
                self.current_page + 1,
                self.total_pages()
            )))
        } else {
            embed
        }
    }

    /// Create a message with embed
    pub fn create_message(&self) -> CreateMessage {
        CreateMessage::default().embed(self.current_embed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize) -> Table {
        let mut table = Table::new(vec!["Date", "Close"]);
        for i in 0..rows {
            table.add_row(vec![format!("day-{:04}", i), format!("{:.2}", i as f64)]);
        }
        table
    }

    #[test]
    fn test_pages_repeat_header() {
        let page = Page::from_table("AAPL", &table(25), 10);
        assert_eq!(page.total_pages(), 3);
        assert!(page.pages.iter().all(|p| p.contains("Date")));
        assert!(page.pages[2].contains("day-0024"));
        assert!(!page.pages[2].contains("day-0019"));
    }

    #[test]
    fn test_go_to_clamps() {
        let mut page = Page::from_table("AAPL", &table(25), 10);
        page.go_to(99);
        assert_eq!(page.current_page, 2);
        page.go_to(0);
        assert_eq!(page.current_page, 0);
    }

    #[test]
    fn test_empty_table_has_one_page() {
        let page = Page::from_table("AAPL", &table(0), 10);
        assert_eq!(page.total_pages(), 1);
    }

    #[test]
    fn test_pages_fit_embed_limit() {
        let page = Page::from_table("AAPL", &table(1000), 1000);
        assert!(page.total_pages() > 1);
        assert!(page.pages.iter().all(|p| p.len() <= Page::MAX_DESCRIPTION + 100));
    }
}
