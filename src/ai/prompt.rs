//! Prompt text for each AI request. Pure functions, no I/O.

use crate::models::TaskBrief;

pub fn schedule_prompt(hint: Option<&str>, tasks: &[TaskBrief]) -> String {
    let hint = match hint.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => "No hint",
    };

    let task_lines = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let description = match t.description.as_deref().map(str::trim) {
                Some(d) if !d.is_empty() => d,
                _ => "none",
            };
            format!(
                "{}) {} - Due: {} - Description: {}",
                i + 1,
                t.title,
                t.due_at,
                description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an AI that creates a smart daily plan.\n\
         Reply in the same language as the user hint (Arabic, English or Turkish are common).\n\
         \n\
         User hint:\n\
         \"{hint}\"\n\
         \n\
         User tasks:\n\
         {task_lines}\n\
         \n\
         Return:\n\
         - timeline\n\
         - priorities\n\
         - work/study blocks\n\
         - breaks\n\
         - short explanation\n"
    )
}

pub fn suggest_prompt() -> String {
    "Give 6 useful daily tasks.\n\
     The user may speak Arabic, English, or Turkish.\n\
     Return in English if no language detected.\n"
        .to_string()
}

pub fn plan_prompt(text: &str) -> String {
    format!(
        "User daily input:\n\
         \"{}\"\n\
         \n\
         Create a realistic time schedule for the day.\n\
         Output must be bullet points with hours:\n\
         \n\
         Example format:\n\
         08:00 - Task A\n\
         09:30 - Task B\n\
         11:00 - Task C\n",
        text.trim()
    )
}
