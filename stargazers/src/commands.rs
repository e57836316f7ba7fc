use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

fn source_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-u --"url" <URL>)
            .required(false)
            .help("Search results page to fetch, e.g. https://search.nixos.org/packages?query=ripgrep")
            .value_parser(clap::value_parser!(Url))
            .conflicts_with("file"),
    )
    .arg(
        arg!(-F --"file" <PATH>)
            .required(false)
            .help("Saved or browser-dumped results page; re-read on every poll")
            .value_parser(clap::value_parser!(std::path::PathBuf))
            .conflicts_with("url"),
    )
    .arg(
        arg!(--"poll-interval" <SECONDS>)
            .required(false)
            .help("Seconds between checks for the package result list")
            .value_parser(clap::value_parser!(u64))
            .default_value("1"),
    )
    .arg(
        arg!(--"max-polls" <COUNT>)
            .required(false)
            .help("Re-checks before giving up on the page")
            .value_parser(clap::value_parser!(u32))
            .default_value("5"),
    )
    .arg(
        arg!(--"no-label-filter")
            .required(false)
            .help("Consider every link in the package detail list, not only \"Homepage\"")
            .action(clap::ArgAction::SetTrue),
    )
    .arg(
        arg!(--"force")
            .required(false)
            .help("Process URLs that do not look like a package search results page")
            .action(clap::ArgAction::SetTrue),
    )
}

fn lookup_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-b --"batch-size" <SIZE>)
            .required(false)
            .help("Star lookups issued together before waiting for the batch")
            .value_parser(clap::value_parser!(u64).range(1..))
            .default_value("3")
            .conflicts_with("parallel"),
    )
    .arg(
        arg!(--"parallel")
            .required(false)
            .help("Issue every star lookup at once instead of in batches")
            .action(clap::ArgAction::SetTrue),
    )
    .arg(
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("Request timeout in seconds")
            .value_parser(clap::value_parser!(u64).range(1..))
            .default_value("10"),
    )
    .arg(
        arg!(--"api-base" <URL>)
            .required(false)
            .help("GitHub API root")
            .default_value("https://api.github.com"),
    )
    .arg(
        arg!(-f --"format" <FORMAT>)
            .required(false)
            .help("Report format: text, json, markdown")
            .value_parser(["text", "json", "markdown"])
            .default_value("text"),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("stargazers")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("stargazers")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and progress output")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            lookup_args(source_args(command!("annotate").about(
                "Add a GitHub star badge next to every package whose homepage is a GitHub \
                repository, and write the annotated page.",
            )))
            .arg(
                arg!(-o --"output" <PATH>)
                    .required(false)
                    .help("Write the annotated HTML here (default: stdout)")
                    .value_parser(clap::value_parser!(std::path::PathBuf)),
            ),
        )
        .subcommand(source_args(command!("discover").about(
            "List the GitHub repository homepages found on a results page, without \
            calling the GitHub API.",
        )))
        .subcommand(
            lookup_args(command!("stars").about("Look up star counts for repositories directly"))
                .arg(
                    arg!([REPO] ...)
                        .required(false)
                        .help("Repository URLs or owner/repo pairs"),
                )
                .arg(
                    arg!(-H --"repos-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of repositories")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<clap::ArgMatches, clap::Error> {
        command_argument_builder().try_get_matches_from(args)
    }

    #[test]
    fn test_command_tree_is_consistent() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(parse(&["stargazers", "stars", "acme/widget", "--timeout", "0"]).is_err());
        assert!(parse(&["stargazers", "annotate", "-F", "page.html", "--timeout", "0"]).is_err());

        let matches = parse(&["stargazers", "stars", "acme/widget", "--timeout", "3"]).unwrap();
        let (_, stars) = matches.subcommand().unwrap();
        assert_eq!(stars.get_one::<u64>("timeout"), Some(&3));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert!(parse(&["stargazers", "stars", "acme/widget", "--batch-size", "0"]).is_err());
    }

    #[test]
    fn test_url_and_file_conflict() {
        let result = parse(&[
            "stargazers",
            "discover",
            "-u",
            "https://search.nixos.org/packages?query=fd",
            "-F",
            "page.html",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_is_global() {
        let matches = parse(&["stargazers", "stars", "acme/widget", "-q"]).unwrap();
        let (name, stars) = matches.subcommand().unwrap();
        assert_eq!(name, "stars");
        assert!(stars.get_flag("quiet"));
    }
}
