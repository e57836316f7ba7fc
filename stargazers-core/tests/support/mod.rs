// Shared fixtures: a trimmed copy of the search.nixos.org results markup

#![allow(dead_code)]

pub fn package_row(name: &str, homepage: &str) -> String {
    format!(
        r#"<li class="package">
    <h2><a href="/packages?show={name}">{name}</a></h2>
    <ul>
        <li><a href="https://search.nixos.org/packages?show={name}">Details</a></li>
        <li><a href="https://github.com/NixOS/nixpkgs/blob/nixos-unstable/pkgs/{name}/default.nix">📦 Source</a></li>
        <li><a href="{homepage}">🌐 Homepage</a></li>
    </ul>
</li>"#
    )
}

pub fn results_page(rows: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><title>NixOS Search - Packages</title></head>
<body>
<div class="search-page success">
  <div class="search-results">
    <div>
      <ul>
{}
      </ul>
    </div>
  </div>
</div>
</body></html>"#,
        rows.join("\n")
    )
}

pub fn loading_page() -> String {
    r#"<!DOCTYPE html><html><body><div class="search-page loading"><div class="loader"></div></div></body></html>"#
        .to_string()
}
