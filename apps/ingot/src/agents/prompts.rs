// Prompt constants for the outreach agents. Output-format instructions are
// appended by `llm_client::prompts::output_instructions`.

// ──────────────────────────────────────────────────────────────
// Research
// ──────────────────────────────────────────────────────────────

pub const RESEARCH_SYSTEM: &str = "You are a deep research agent for cold outreach. \
    Build accurate intelligence on a company and the person being contacted. \
    Only state facts supported by the material you are given.";

/// Replace: {company_name}, {source_text}
pub const FETCH_COMPANY_PROMPT_TEMPLATE: &str = r#"Profile the company "{company_name}".

Describe what it sells in one or two sentences and list growth signals
(funding stage, team size, hiring, launches) that the material supports.

SOURCE MATERIAL:
{source_text}"#;

/// Replace: {person_name}, {person_role}, {company_name}, {person_notes}
pub const FETCH_PERSON_PROMPT_TEMPLATE: &str = r#"Summarise the background of {person_name} ({person_role}) at {company_name}
in two or three sentences a cold email could build on.

NOTES:
{person_notes}"#;

/// Replace: {company_json}, {person_json}
pub const IDENTIFY_SIGNALS_PROMPT_TEMPLATE: &str = r#"List the recent signals that make now a good time to reach out:
funding, hiring posts, blog posts, launches, open-source activity.
Each signal is one short sentence.

COMPANY:
{company_json}

PERSON:
{person_json}"#;

/// Replace: {company_json}, {person_json}, {signals_json}
pub const SYNTHESISE_PROMPT_TEMPLATE: &str = r#"Write between one and three talking points for a cold email.
Each must reference something specific from the material below, never a generic compliment.

COMPANY:
{company_json}

PERSON:
{person_json}

SIGNALS:
{signals_json}"#;

// ──────────────────────────────────────────────────────────────
// Matcher
// ──────────────────────────────────────────────────────────────

pub const MATCHER_SYSTEM: &str = "You are a qualification matching agent. \
    Cross-reference the sender's background against a lead's opportunity. \
    Be concrete: name skills and experience, not adjectives.";

/// Replace: {profile_json}, {brief_json}
pub const COMPARE_PROMPT_TEMPLATE: &str = r#"Compare the sender with the lead.
List the skills and experience that overlap with what the company needs,
the gaps, and a two-sentence summary of the fit.

SENDER:
{profile_json}

LEAD:
{brief_json}"#;

/// Replace: {profile_json}, {brief_json}, {analysis_json}
pub const SCORE_PROMPT_TEMPLATE: &str = r#"Score the fit between the sender and the lead from 0 to 100,
write a value proposition specific to this company and role,
and give your confidence as exactly one of: high, medium, low.

SENDER:
{profile_json}

LEAD:
{brief_json}

ANALYSIS:
{analysis_json}"#;

// ──────────────────────────────────────────────────────────────
// Writer
// ──────────────────────────────────────────────────────────────

pub const MCQ_SYSTEM: &str = "You are generating personalised questions that help craft \
    a cold outreach email. Generate two or three questions. Every question must reference \
    specific data from the brief (company, product, person, signal). Questions must be \
    answerable in one or two sentences.";

/// Replace: {company_name}, {product}, {person_name}, {person_role}, {signals}, {talking_points}
pub const MCQ_PROMPT_TEMPLATE: &str = r#"COMPANY CONTEXT FOR QUESTIONS:
Company: {company_name}
Product: {product}
Contact: {person_name} ({person_role})
Signals: {signals}
Talking points:
{talking_points}

Ask about: what genuinely interests the sender about this company,
the goal of the email (informational interview, direct job ask, connection),
and optionally which of the sender's projects relates most to their challenge."#;

pub const WRITER_SYSTEM: &str = "You are an expert at writing personalised cold outreach emails. \
    Never use generic phrases such as 'I would be a great fit', 'I am passionate about' or \
    'I came across your company online'. The body must name the company and use at least one \
    talking point. subject_a is direct, subject_b is a curiosity question; both reference the \
    company or person. followup_day3 is slightly warmer and adds a new point; followup_day7 is \
    a brief, low-pressure final nudge.";

/// Replace: {tone_label}, {tone_guidance}, {sender}, {recipient}, {talking_points},
///          {value_proposition}, {answers}
pub const DRAFT_PROMPT_TEMPLATE: &str = r#"TONE GUIDANCE ({tone_label}):
{tone_guidance}

SENDER:
{sender}

RECIPIENT:
{recipient}

TALKING POINTS (use at least one):
{talking_points}

VALUE PROPOSITION: {value_proposition}

{answers}"#;

pub const TONE_HR: &str = "The reader is an HR or recruiting professional. \
    Tone: professional, process-focused, slightly formal. Length: 150-250 words. \
    Structure: why you are reaching out, relevant credentials, specific skill match, \
    clear ask (interview, call or application process).";

pub const TONE_CTO: &str = "The reader is a CTO or technical lead. \
    Tone: direct, technical, peer-to-peer; skip pleasantries. Length: 80-150 words. \
    Structure: a specific technical observation about their stack or product, one or two \
    technical credentials, one talking point, direct ask. Do not list skills like a resume.";

pub const TONE_CEO: &str = "The reader is a CEO or founder. \
    Tone: mission-focused and direct. Length: 80-150 words. \
    Structure: a genuine observation about the company's mission or achievement, why this \
    company specifically, one credential showing you move fast, clear ask.";

pub const TONE_DEFAULT: &str = "The reader's exact role is unknown. \
    Tone: professional but direct. Length: 100-200 words. \
    Structure: brief intro, specific observation about the company, relevant experience, \
    clear ask. Avoid corporate filler.";

pub const UNSUBSCRIBE_LINE: &str =
    "Not interested? Reply with 'unsubscribe' to be removed from future outreach.";
