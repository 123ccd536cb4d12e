use std::fs;

const VARIANTS: &[&str] = &["default", "classic", "grace", "simple"];

fn main() {
    // Validate the built-in theme table at compile time
    let themes_path = "src/themes.toml";
    println!("cargo:rerun-if-changed={}", themes_path);

    let content = fs::read_to_string(themes_path).expect("Failed to read themes.toml");

    let table = match content.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("Invalid themes.toml: {}", e),
    };

    if !table.contains_key("default") {
        panic!("themes.toml must define the `default` theme");
    }

    for (name, value) in &table {
        if !VARIANTS.contains(&name.as_str()) {
            panic!("themes.toml: unknown theme variant `{}`", name);
        }
        let Some(theme) = value.as_table() else {
            panic!("themes.toml: `{}` must be a table", name);
        };
        for (section, body) in theme {
            if section != "base" && section != "elements" {
                panic!("themes.toml: `{}.{}` is not `base` or `elements`", name, section);
            }
            if !body.is_table() {
                panic!("themes.toml: `{}.{}` must be a table", name, section);
            }
        }
    }
}
