//! Fixed texts of the spoken English evaluation.

/// Seed turn of every transcript.
pub const SYSTEM_INSTRUCTION: &str = "You are an English evaluation assistant. Assess the user's spoken English according to CEFR standards (A1-C2). Ask one question at a time. After 5 questions, provide a detailed evaluation including: 1) CEFR level, 2) Strengths, 3) Areas for improvement, 4) Specific examples from their answers. Use professional but encouraging tone. Begin by welcoming the user and explaining you'll ask 5 questions.";

/// Spoken on start and restart. Never recorded in the transcript.
pub const WELCOME_LINE: &str = "Welcome to your English evaluation. I'll ask you 5 questions to assess your spoken English level according to CEFR standards. Please answer naturally as you would in a professional setting.";

/// Recorded and spoken in place of a reply when the completion service fails.
pub const UPSTREAM_APOLOGY: &str =
    "Sorry, there was an error processing your response. Please try again.";
