// Prompt construction for the conversation engine.

use crate::chat::context::ConversationContext;
use crate::llm_client::speaker;
use crate::models::opportunity::format_usd;
use crate::models::profile::ConversationTurn;

/// Role and workflow instructions placed ahead of every conversation.
pub const ASSISTANT_SYSTEM: &str = "\
You are Oput, an intelligent AI assistant specialized in helping students discover personalized \
educational opportunities from a real database of scholarships, grants, and fellowships.

Your role:
- Gather complete user profile information BEFORE providing opportunities
- Only provide opportunities when you have sufficient profile information
- Guide students through the application process

CRITICAL WORKFLOW:
1. FIRST: Collect user's academic level (undergraduate/graduate/phd)
2. THEN: Collect field of study (be specific - Computer Science, Engineering, Medicine, etc.)
3. THEN: Collect citizenship/nationality (very important for eligibility)
4. OPTIONALLY: Collect GPA, country preferences, work experience
5. ONLY AFTER having academic level, field, and citizenship: Offer to search for personalized opportunities";

pub const ASSISTANT_GUIDELINES: &str = "\
Guidelines:
- Be conversational and helpful
- Ask ONE question at a time to gather missing information
- Do NOT offer to search for opportunities until profile is complete (academic level + field + citizenship)
- When profile is complete, ask if they'd like you to search for personalized opportunities
- If opportunities were found, congratulate them and explain what's available
- Keep responses concise but informative
- Be encouraging and supportive throughout the process";

/// Flattens the system instructions, profile checklist, search results and the
/// transcript into a single prompt.
pub fn build_conversation_prompt(turns: &[ConversationTurn], context: &ConversationContext) -> String {
    let mut prompt = String::from(ASSISTANT_SYSTEM);
    prompt.push_str("\n\n");

    let context_json = serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string());
    prompt.push_str(&format!("Current context: {context_json}\n\n"));

    let profile = &context.collected_info;
    prompt.push_str("Profile completeness check:\n");
    prompt.push_str(&checklist_line(
        "Academic level",
        profile.academic_level.map(|l| l.to_string()).as_deref(),
    ));
    prompt.push_str(&checklist_line(
        "Field of study",
        profile.field_of_study.as_deref(),
    ));
    prompt.push_str(&checklist_line("Citizenship", profile.citizenship.as_deref()));
    prompt.push_str(&format!(
        "- Profile complete: {}\n\n",
        if context.profile_complete {
            "YES - Ready to search!"
        } else {
            "NO - Need more info"
        }
    ));

    if let Some(found) = &context.found_opportunities {
        prompt.push_str(&format!(
            "OPPORTUNITIES FOUND: {} personalized opportunities have been found and are now available in the Results section!\n\nTop matches:\n",
            found.count
        ));
        for m in &found.top_matches {
            prompt.push_str(&format!(
                "• {} at {} ({}% match, {} funding)\n",
                m.title,
                m.institution,
                m.match_score,
                format_usd(m.funding_amount)
            ));
        }
        prompt.push_str(
            "\nLet the user know they can:\n\
             1. View all opportunities in the Results tab\n\
             2. Track their applications in the Tracker tab\n\
             3. Download a CSV file with all opportunities for offline reference\n\n",
        );
    }

    prompt.push_str(ASSISTANT_GUIDELINES);
    prompt.push_str("\n\nConversation:\n");

    let transcript = turns
        .iter()
        .map(|t| format!("{}: {}", speaker(t.role), t.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    prompt.push_str(&transcript);
    prompt.push_str("\n\nPlease provide a helpful response as Oput:");
    prompt
}

fn checklist_line(label: &str, value: Option<&str>) -> String {
    match value {
        Some(v) => format!("- {label}: ✓ {v}\n"),
        None => format!("- {label}: ✗ Missing\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::context::{FoundOpportunities, MatchSummary};
    use crate::models::opportunity::AcademicLevel;
    use crate::models::profile::UserProfile;

    #[test]
    fn test_prompt_marks_missing_fields() {
        let context = ConversationContext {
            collected_info: UserProfile {
                academic_level: Some(AcademicLevel::Phd),
                ..Default::default()
            },
            ..Default::default()
        };
        let prompt = build_conversation_prompt(&[ConversationTurn::user("I'm a PhD student")], &context);
        assert!(prompt.contains("- Academic level: ✓ phd"));
        assert!(prompt.contains("- Field of study: ✗ Missing"));
        assert!(prompt.contains("NO - Need more info"));
        assert!(prompt.contains("User: I'm a PhD student"));
        assert!(!prompt.contains("OPPORTUNITIES FOUND"));
    }

    #[test]
    fn test_prompt_lists_top_matches() {
        let context = ConversationContext {
            profile_complete: true,
            found_opportunities: Some(FoundOpportunities {
                count: 4,
                top_matches: vec![MatchSummary {
                    title: "Chevening Scholarship".to_string(),
                    institution: "FCDO".to_string(),
                    match_score: 88,
                    funding_amount: 50000.0,
                }],
            }),
            ..Default::default()
        };
        let prompt = build_conversation_prompt(&[], &context);
        assert!(prompt.contains("OPPORTUNITIES FOUND: 4"));
        assert!(prompt.contains("• Chevening Scholarship at FCDO (88% match, $50,000 funding)"));
        assert!(prompt.contains("YES - Ready to search!"));
    }
}
