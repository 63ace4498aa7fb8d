use repoqa::indexer::chunker::{LANGUAGES, UNKNOWN_LANGUAGE};

fn languages_table() -> String {
    let mut table = String::from("Supported languages:\n");
    for (extension, language) in LANGUAGES {
        table.push_str(&format!("  {:<8} {}\n", extension, language));
    }
    table.push_str(&format!("  {:<8} {}\n", "other", UNKNOWN_LANGUAGE));
    table
}

pub fn list_languages() {
    print!("{}", languages_table());
}
