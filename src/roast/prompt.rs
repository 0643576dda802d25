//! Roast prompt construction.
//! Every profile field is embedded; absent optional fields get an explicit placeholder.

use std::fmt::Write;

use super::Language;
use crate::profile::ProfileRecord;

const UNKNOWN: &str = "Unknown";
const NOT_PROVIDED: &str = "Not provided";

const HINDI_GUIDELINES: &[&str] = &[
    "Restrict to <60 words",
    "Create roast for Indian users in a natural-sounding way",
    "Use English transliteration of Hindi phrases",
    "Focus on the user's activity, bio, location, or any other interesting profile details",
    "If their GitHub activity is impressive, acknowledge it humorously",
    "Avoid generic roasts that could apply to anyone",
    "Keep it light-hearted and avoid truly offensive content",
    "Be creative and don't mention the number of repositories directly",
];

const ENGLISH_GUIDELINES: &[&str] = &[
    "Restrict to <80 words",
    "use slangs not proper grammar",
    "Use pure English for the roast",
    "Focus on witty wordplay and puns in English",
    "Incorporate references to popular Western tech culture if relevant",
    "Focus on the user's GitHub activity, bio, location, or any other interesting profile details",
    "If their GitHub activity is impressive, acknowledge it humorously",
    "Avoid generic roasts that could apply to anyone",
    "Keep it light-hearted and avoid truly offensive content",
    "Be creative and don't mention the number of repositories directly",
];

fn or_placeholder<'a>(value: &'a Option<String>, placeholder: &'a str) -> &'a str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or(placeholder)
}

/// Build the full instruction block for one roast.
pub fn build_prompt(profile: &ProfileRecord, language: Language) -> String {
    let (intro, guidelines) = match language {
        Language::Hindi => (
            "Generate a personalized, humorous roast in Hindi using English transliteration only",
            HINDI_GUIDELINES,
        ),
        Language::English => (
            "Generate a personalized, humorous roast in English",
            ENGLISH_GUIDELINES,
        ),
    };

    let name = or_placeholder(&profile.name, UNKNOWN);
    let mut prompt = String::with_capacity(1536);

    // write! into a String cannot fail
    let _ = writeln!(
        prompt,
        "{intro} for a GitHub user with the following ACCURATE profile data:"
    );
    let _ = writeln!(prompt, "Username: {}", profile.username);
    let _ = writeln!(prompt, "Name: {name}");
    let _ = writeln!(
        prompt,
        "Public Repositories: {} (THIS IS THE CORRECT NUMBER OF REPOS)",
        profile.public_repos
    );
    let _ = writeln!(prompt, "Followers: {}", profile.followers);
    let _ = writeln!(prompt, "Following: {}", profile.following);
    let _ = writeln!(
        prompt,
        "Contributions Last Year: {}",
        profile.contributions_last_year
    );
    let _ = writeln!(prompt, "Bio: {}", or_placeholder(&profile.bio, NOT_PROVIDED));
    let _ = writeln!(
        prompt,
        "Location: {}",
        or_placeholder(&profile.location, NOT_PROVIDED)
    );
    let _ = writeln!(
        prompt,
        "Company: {}",
        or_placeholder(&profile.company, NOT_PROVIDED)
    );
    let _ = writeln!(
        prompt,
        "Hireable: {}",
        if profile.hireable.unwrap_or(false) { "Yes" } else { "No" }
    );
    let _ = writeln!(
        prompt,
        "IMPORTANT: Ensure your roast accurately reflects the data provided, especially the number of public repositories ({}).",
        profile.public_repos
    );
    prompt.push_str("Guidelines for the roast:\n");
    for line in guidelines {
        let _ = writeln!(prompt, "- {line}");
    }
    let target = or_placeholder(&profile.name, "this user");
    let _ = write!(
        prompt,
        "Now, generate a personalized, humorous roast for {target} based on their SPECIFIC GitHub profile data:"
    );
    prompt
}
