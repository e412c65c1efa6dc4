use colored::Colorize;
use hwp_tagger::interactive::QUIT_COMMAND;
use hwp_tagger::tags::TagType;

/// Execute the tags command
pub fn execute() {
    println!("{}", "Tag commands:".green().bold());
    println!();
    for tag in TagType::ALL.iter().filter(|t| **t != TagType::Invalid) {
        let follow_up = if tag.has_prompt() {
            format!(" (asks for the {})", tag.prompt())
        } else {
            String::new()
        };
        println!("  {}  {}{}", tag.code().cyan(), tag.description(), follow_up.dimmed());
    }
    println!("  {}  quit", QUIT_COMMAND.cyan());
    println!();
    println!(
        "{}",
        "Append a look-back duration to a command: e30s, t2m, n1h".dimmed()
    );
}
