//! Jumbo loans: price range, credit, income, down payment and rate type.

use crate::chat::model::{AuthAction, FlowKind, Handoff, MessageSpec};
use crate::chat::state::fields;
use crate::chat::table::{Row, TransitionTable};

/// Profile summary shown when the visitor declines a rate estimate.
const PROFILE_SUMMARY: &str = "Here's a quick summary of your Jumbo Loan profile, {{ firstName }}:

• Loan Type: Jumbo (Purchase)
• Minimum Down Payment: 10–20%
• Credit Score: Ideally 700+
• Income/Asset Verification: Required
• Rate Type: {{ rateType | default(\"Not specified\") }}
• Property Type: {{ propertyType | default(\"Not specified\") }}";

fn yes_no(text: &str) -> MessageSpec {
    MessageSpec::say(text).with_choices(["Yes", "No"])
}

fn budget_prompt() -> MessageSpec {
    yes_no("Do you already know your target price range?").after_ms(1000)
}

fn credit_prompt() -> MessageSpec {
    yes_no("Would you say your credit score is 700 or higher?").after_ms(1000)
}

fn income_prompt() -> MessageSpec {
    yes_no("Do you currently have verifiable income or substantial liquid assets?").after_ms(1000)
}

fn down_payment_prompt() -> MessageSpec {
    yes_no("Do you already have a down payment saved?").after_ms(1000)
}

fn residence_prompt() -> MessageSpec {
    yes_no("Is this home going to be your primary residence?").after_ms(1000)
}

fn location_prompt() -> MessageSpec {
    MessageSpec::then("Which state or city are you planning to buy in?")
}

fn rate_estimate_prompt() -> MessageSpec {
    yes_no("Would you like to get a rate estimate based on your profile?").after_ms(1000)
}

/// A Yes/No step where both answers get their own acknowledgement and then
/// continue to the same place.
fn either_way(
    step: &str,
    yes: &str,
    no: &str,
    next: &str,
    prompt: MessageSpec,
) -> [(String, String, Row); 2] {
    [
        (
            step.to_string(),
            "Yes".to_string(),
            Row::to(next).say(MessageSpec::say(yes)).say(prompt.clone()),
        ),
        (
            step.to_string(),
            "No".to_string(),
            Row::to(next).say(MessageSpec::say(no)).say(prompt),
        ),
    ]
}

pub fn table() -> TransitionTable {
    let mut b = TransitionTable::builder(FlowKind::Jumbo, "greeting")
        .opening(yes_no(
            "Hi {{ firstName }} 👋, welcome! Are you looking to explore Jumbo Loan options for purchasing a high-value home?",
        ))
        // ── Opening ─────────────────────────────────────────────────────
        .on_choice(
            "greeting",
            "Yes",
            Row::to("property_type")
                .say(MessageSpec::say(
                    "Perfect! Let's make sure this type of loan is the right fit for your goals.",
                ))
                .say(
                    yes_no(
                        "Are you purchasing a home that's priced above the conforming loan limit in your area?",
                    )
                    .after_ms(1000),
                ),
        )
        .on_choice(
            "greeting",
            "No",
            Row::to("other_options").say(yes_no(
                "No problem, {{ firstName }}. Would you like to look into another mortgage option instead?",
            )),
        )
        .on_choice(
            "other_options",
            "Yes",
            Row::to("redirect_service").say(
                MessageSpec::say(
                    "I can help with that! Which one would you like to explore — First-Time Buyer, Government-Backed Loan, or Refinance?",
                )
                .with_choices(["First-Time Buyer", "Government-Backed Loan", "Refinance"]),
            ),
        )
        .on_choice(
            "other_options",
            "No",
            Row::to("end").say(MessageSpec::say(
                "That's okay! You can always come back when you're ready — I'll save your preferences.",
            )),
        );

    for (label, destination) in [
        ("First-Time Buyer", "first-time-buyer"),
        ("Government-Backed Loan", "government-backed"),
        ("Refinance", "ellen-refinance"),
    ] {
        b = b.on_choice(
            "redirect_service",
            label,
            Row::to("end")
                .say(MessageSpec::say(
                    "Great! Redirecting you to {{ response }} options...",
                ))
                .defer(Handoff::Host(destination.to_string())),
        );
    }

    // ── Price range and budget ──────────────────────────────────────────
    b = b
        .on_choice(
            "property_type",
            "Yes",
            Row::to("budget")
                .say(MessageSpec::say(
                    "Got it. That usually means a property over $750,000, depending on location. Let's confirm a few details.",
                ))
                .say(budget_prompt()),
        )
        .on_choice(
            "property_type",
            "No",
            Row::to("conventional_option").say(yes_no(
                "Then you might not need a Jumbo Loan. Would you like to see conventional mortgage options instead?",
            )),
        )
        .on_choice(
            "conventional_option",
            "Yes",
            Row::to("end").say(MessageSpec::say(
                "Great! I'll take you to the First-Time Buyer or Conventional flow to explore your options.",
            )),
        )
        .on_choice(
            "conventional_option",
            "No",
            Row::to("budget")
                .say(MessageSpec::say(
                    "No problem! We can still explore Jumbo eligibility — it's good to know all your options.",
                ))
                .say(budget_prompt()),
        )
        .on_choice(
            "budget",
            "Yes",
            Row::to("budget_input").say(MessageSpec::say(
                "Awesome! How much are you planning to spend on your new home?",
            )),
        )
        .on_choice(
            "budget",
            "No",
            Row::to("budget_estimate").say(yes_no(
                "No worries — I can estimate a comfortable budget for you. Do you want me to do that?",
            )),
        )
        .on_text(
            "budget_input",
            Row::to("credit_profile")
                .capture(fields::BUDGET)
                .say(MessageSpec::say(
                    "Thanks, {{ firstName }}. That helps tailor the loan amount we'll estimate later.",
                ))
                .say(credit_prompt()),
        )
        .on_choice(
            "budget_estimate",
            "Yes",
            Row::to("budget_estimate_ready").say(yes_no(
                "Perfect. I'll need your approximate income and credit score to do that. Ready to share those?",
            )),
        )
        .on_choice(
            "budget_estimate",
            "No",
            Row::to("credit_profile")
                .say(MessageSpec::say("Okay, we'll skip the estimation and move on."))
                .say(credit_prompt()),
        )
        .on_choice(
            "budget_estimate_ready",
            "Yes",
            Row::to("credit_profile").say(credit_prompt()),
        )
        .on_choice(
            "budget_estimate_ready",
            "No",
            Row::to("credit_profile")
                .say(MessageSpec::say(
                    "That's fine! I'll keep your budget open-ended for now and show you flexible options later.",
                ))
                .say(credit_prompt()),
        )
        // ── Credit and income ───────────────────────────────────────────
        .on_choice(
            "credit_profile",
            "Yes",
            Row::to("income_check")
                .say(MessageSpec::say(
                    "Excellent — that's great for Jumbo Loan qualification.",
                ))
                .say(income_prompt()),
        )
        .on_choice(
            "credit_profile",
            "No",
            Row::to("credit_boost").say(yes_no(
                "That's totally fine. Jumbo loans often start at 700+, but there are exceptions. Would you like me to show how to boost your score or check alternative lenders?",
            )),
        )
        .on_choice(
            "income_check",
            "Yes",
            Row::to("down_payment")
                .say(MessageSpec::say(
                    "Perfect — lenders will love that stability. Let's move to down payment details.",
                ))
                .say(down_payment_prompt()),
        )
        .on_choice(
            "income_check",
            "No",
            Row::to("income_alternatives").say(yes_no(
                "No worries — there are programs that use asset-based verification or co-borrowers. Do you want to explore those options?",
            )),
        )
        // ── Down payment and residence ──────────────────────────────────
        .on_choice(
            "down_payment",
            "Yes",
            Row::to("down_payment_amount").say(yes_no(
                "Awesome! Are you planning to put down at least 10–20% of the home's value?",
            )),
        )
        .on_choice(
            "down_payment",
            "No",
            Row::to("down_payment_advisor").say(yes_no(
                "No problem. We can help you plan toward a down payment. Would you like to connect with our financial advisor?",
            )),
        )
        .on_choice(
            "down_payment_amount",
            "Yes",
            Row::to("property_intent")
                .say(MessageSpec::say(
                    "Fantastic — that's perfect for Jumbo Loan standards.",
                ))
                .say(residence_prompt()),
        )
        .on_choice(
            "down_payment_amount",
            "No",
            Row::to("down_payment_explain").say(yes_no(
                "That's okay — you might still qualify, but we'll explore options that require higher rates or secondary financing. Want me to explain?",
            )),
        );

    let shared = [
        either_way(
            "credit_boost",
            "I'll send you a short guide and lender options that work with mid-level scores.",
            "Alright, I'll just note that and keep your file flexible.",
            "income_check",
            income_prompt(),
        ),
        either_way(
            "income_alternatives",
            "I'll share a summary of flexible income verification programs once we're done here.",
            "Okay, I'll note that. Let's still review your down payment options.",
            "down_payment",
            down_payment_prompt(),
        ),
        either_way(
            "down_payment_explain",
            "I'll share examples of secondary loan combinations to help lower your total cost.",
            "Alright, I'll mark your down payment as flexible for now.",
            "property_intent",
            residence_prompt(),
        ),
        either_way(
            "down_payment_advisor",
            "Perfect — I'll schedule a free consultation link for you after this chat.",
            "Got it. We'll move ahead with estimated assumptions.",
            "property_intent",
            residence_prompt(),
        ),
        either_way(
            "rate_compare",
            "I'll prepare a comparison summary for you.",
            "No worries, I'll just show you the adjustable estimates.",
            "rate_estimate",
            rate_estimate_prompt(),
        ),
    ];
    for (step, label, row) in shared.into_iter().flatten() {
        b = b.on_choice(&step, &label, row);
    }

    b = b
        .on_choice(
            "property_intent",
            "Yes",
            Row::to("location")
                .capture_fixed(fields::PROPERTY_TYPE, "Primary")
                .say(MessageSpec::say(
                    "Perfect — that usually means better terms and lower rates.",
                ))
                .say(location_prompt()),
        )
        .on_choice(
            "property_intent",
            "No",
            Row::to("property_secondary").say(
                MessageSpec::say("Got it. Is it a second home or an investment property?")
                    .with_choices(["Second Home", "Investment"]),
            ),
        )
        .on_choice(
            "property_secondary",
            "Second Home",
            Row::to("location")
                .capture(fields::PROPERTY_TYPE)
                .say(MessageSpec::say("Alright — we'll mark it as secondary use."))
                .say(location_prompt()),
        )
        .on_any_choice(
            "property_secondary",
            Row::to("location")
                .capture(fields::PROPERTY_TYPE)
                .say(MessageSpec::say(
                    "Okay — investment Jumbo Loans have stricter terms, but you can still qualify with solid credit.",
                ))
                .say(location_prompt()),
        )
        .on_text(
            "location",
            Row::to("loan_term")
                .capture(fields::LOCATION)
                .say(MessageSpec::say(
                    "Thanks! That helps me confirm your local loan limits and property tax factors.",
                ))
                .say(
                    MessageSpec::then("Would you prefer a fixed-rate or adjustable-rate loan?")
                        .with_choices(["Fixed", "Adjustable"]),
                ),
        )
        // ── Rate type and summary ───────────────────────────────────────
        .on_choice(
            "loan_term",
            "Fixed",
            Row::to("rate_estimate")
                .capture(fields::RATE_TYPE)
                .say(MessageSpec::say(
                    "Stable choice — predictable payments, great for long-term planning.",
                ))
                .say(rate_estimate_prompt()),
        )
        .on_any_choice(
            "loan_term",
            Row::to("rate_compare").capture(fields::RATE_TYPE).say(yes_no(
                "Got it — adjustable loans can start lower, but may rise over time. Want me to compare both side-by-side?",
            )),
        )
        .on_choice(
            "rate_estimate",
            "Yes",
            Row::to("login_trigger").say(
                MessageSpec::say(
                    "Great! Please sign in or create an account to generate your personalized rate.",
                )
                .with_choices(["Log in", "Create account"]),
            ),
        )
        .on_choice(
            "rate_estimate",
            "No",
            Row::to("summary_save")
                .say(MessageSpec::say(
                    "That's okay — I can still give you a summary of your eligibility right now.",
                ))
                .say(MessageSpec::then(PROFILE_SUMMARY))
                .say(
                    yes_no("Would you like me to email or save your loan profile for later access?")
                        .after_ms(1000),
                ),
        )
        .on_choice(
            "login_trigger",
            "Log in",
            Row::to("login_trigger").defer(Handoff::Auth(AuthAction::Login)),
        )
        .on_choice(
            "login_trigger",
            "Create account",
            Row::to("login_trigger").defer(Handoff::Auth(AuthAction::CreateAccount)),
        )
        .on_choice(
            "summary_save",
            "Yes",
            Row::to("email_input").say(MessageSpec::say(
                "Great! Please share your email address so I can send your summary.",
            )),
        )
        .on_choice(
            "summary_save",
            "No",
            Row::to("end").say(MessageSpec::say(
                "No problem — your preferences are saved securely for when you're ready to continue.",
            )),
        )
        .on_text(
            "email_input",
            Row::to("end")
                .capture(fields::EMAIL)
                .say(MessageSpec::say(
                    "Perfect! I'll send your Jumbo Loan summary to that email shortly.",
                )),
        );

    b.build()
}
