pub mod handlers;

// Re-export commonly used helpers for convenience
pub use handlers::{
    collect_repo_links, load_page_source, load_repos_from_file, options_from_args,
    parse_repo_line, should_process, write_output,
};
