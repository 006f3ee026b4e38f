use console::Term;
use owo_colors::OwoColorize;
use unicode_width::UnicodeWidthStr;

use stylemuse_protocol::common::{Message, ProductList, ProductSource, Role};

/// Enhanced UI utilities
pub struct UI {
    term: Term,
}

impl UI {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    /// Helper method to conditionally apply color based on terminal support
    fn colorize<F>(&self, text: &str, color_fn: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        if self.supports_color() {
            color_fn(text)
        } else {
            text.to_string()
        }
    }

    /// Print a success message (color only if supported)
    pub fn success(&self, message: &str) {
        let output = self.colorize(message, |m| m.green().bold().to_string());
        println!("{}", output);
    }

    /// Print an error message (color only if supported)
    pub fn error(&self, message: &str) {
        let output = self.colorize(message, |m| m.red().bold().to_string());
        eprintln!("{}", output);
    }

    /// Print a warning message (color only if supported)
    pub fn warning(&self, message: &str) {
        let output = self.colorize(message, |m| m.yellow().bold().to_string());
        println!("{}", output);
    }

    /// Print an info message (color only if supported)
    pub fn info(&self, message: &str) {
        let output = self.colorize(message, |m| m.blue().bold().to_string());
        println!("{}", output);
    }

    /// Format authentication status with appropriate color (if supported)
    pub fn format_auth_status(&self, authenticated: bool) -> String {
        let text = if authenticated {
            "Logged in"
        } else {
            "Not logged in"
        };

        if self.supports_color() {
            if authenticated {
                text.green().to_string()
            } else {
                text.red().to_string()
            }
        } else {
            text.to_string()
        }
    }

    /// Format server connection status with appropriate color (if supported)
    pub fn format_server_status(&self, connected: bool) -> String {
        let text = if connected {
            "Reachable"
        } else {
            "Connection failed"
        };
        if self.supports_color() {
            if connected {
                text.green().to_string()
            } else {
                text.red().to_string()
            }
        } else {
            text.to_string()
        }
    }

    /// Format user field with fallback for missing data
    pub fn format_user_field(&self, value: Option<String>) -> String {
        value.unwrap_or_else(|| "-".to_string())
    }

    /// Print a blank line for spacing
    pub fn blank_line(&self) {
        println!();
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        let term_width = self.width();
        let title_len = title.len() + 4;
        let line_len = if term_width > title_len {
            (term_width - title_len) / 2
        } else {
            0
        };

        let line = "═".repeat(line_len);
        let supports_color = self.supports_color();

        println!();
        if supports_color {
            println!("{} {} {}", line.cyan(), title.cyan().bold(), line.cyan());
        } else {
            println!("{} {} {}", line, title, line);
        }
        println!();
    }

    /// Print a separator line
    pub fn separator(&self) {
        let width = self.width();
        let line = "─".repeat(width.min(80));
        if self.supports_color() {
            println!("{}", line.dimmed());
        } else {
            println!("{}", line);
        }
    }

    /// Create a card-style display for information
    pub fn card(&self, title: &str, content: Vec<(&str, String)>) {
        let term_width = self.width();
        let card_width = term_width.saturating_sub(4).clamp(50, 80);

        let supports_color = self.supports_color();

        println!("╭{}╮", "─".repeat(card_width - 2));
        let title_width = title.width();
        let title_spaces = card_width.saturating_sub(title_width + 4);
        if supports_color {
            println!("│ {} {}│", title.cyan().bold(), " ".repeat(title_spaces));
        } else {
            println!("│ {} {}│", title, " ".repeat(title_spaces));
        }
        println!("├{}┤", "─".repeat(card_width - 2));

        for (label, value) in content {
            let label_plain = console::strip_ansi_codes(label);
            let value_plain = console::strip_ansi_codes(&value);

            let label_width = label_plain.width();
            let value_width = value_plain.width();
            let content_width = label_width + value_width + 4;

            let spaces = if content_width < card_width - 1 {
                card_width - content_width - 1
            } else {
                1
            };

            if supports_color {
                println!("│ {}: {}{}│", label.dimmed(), value, " ".repeat(spaces));
            } else {
                println!("│ {}: {}{}│", label, value, " ".repeat(spaces));
            }
        }

        println!("╰{}╯", "─".repeat(card_width - 2));
        println!();
    }

    /// Render one chat turn with a role prefix.
    pub fn chat_message(&self, message: &Message) {
        if message.progress.is_some() {
            // Transient status events are not part of the conversation.
            return;
        }

        let supports_color = self.supports_color();
        match message.role {
            Role::User => {
                if supports_color {
                    println!("{} {}", "you ›".bold(), message.content);
                } else {
                    println!("you › {}", message.content);
                }
            }
            Role::Assistant => {
                if supports_color {
                    println!("{} {}", "muse ›".magenta().bold(), message.content);
                } else {
                    println!("muse › {}", message.content);
                }
            }
        }

        if let Some(products) = &message.products {
            self.products(products);
        }
    }

    /// Render a numbered product listing.
    pub fn products(&self, list: &ProductList) {
        let supports_color = self.supports_color();
        let label = match list.source {
            ProductSource::Ranked => "Top picks",
            ProductSource::Styled => "Styled for you",
        };

        println!();
        if supports_color {
            println!("  {}", label.cyan().bold());
        } else {
            println!("  {}", label);
        }

        for (index, product) in list.items.iter().enumerate() {
            let mut details = Vec::new();
            if let Some(price) = &product.price {
                details.push(price.clone());
            }
            if let Some(rating) = product.rating {
                details.push(format!("{rating:.1}★"));
            }
            if let Some(source) = &product.source {
                details.push(source.clone());
            }

            let suffix = if details.is_empty() {
                String::new()
            } else {
                format!(" ({})", details.join(", "))
            };

            if supports_color {
                println!(
                    "  {} {}{}",
                    format!("{}.", index + 1).dimmed(),
                    product.title.bold(),
                    suffix.dimmed()
                );
            } else {
                println!("  {}. {}{}", index + 1, product.title, suffix);
            }

            if let Some(link) = &product.link {
                if supports_color {
                    println!("     {}", link.underline().dimmed());
                } else {
                    println!("     {}", link);
                }
            }
        }
        println!();
    }

    /// Get terminal width for responsive layout
    pub fn width(&self) -> usize {
        self.term.size().1 as usize
    }

    /// Check if terminal supports color
    pub fn supports_color(&self) -> bool {
        self.term.features().colors_supported()
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a progress bar with modern styling
pub fn create_progress_bar(len: u64, message: &str) -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new(len);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{elapsed_precise:.dim}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█▉▊▋▌▍▎▏  ")
    );
    pb.set_message(message.to_string());
    pb
}
