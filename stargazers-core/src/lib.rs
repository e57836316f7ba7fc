pub mod activation;
pub mod annotate;
pub mod gate;
pub mod page;
pub mod report;

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
   ⭐  s t a r g a z e r s  ⭐
   GitHub stars for NixOS package search"#;
    eprintln!("{}", banner.bright_yellow().bold());
    eprintln!(
        "   {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
