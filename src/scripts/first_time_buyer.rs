//! First-time buyer guide: property, budget, credit, down payment and
//! pre-approval.

use crate::chat::model::{AuthAction, FlowKind, Handoff, MessageSpec};
use crate::chat::state::fields;
use crate::chat::table::{Row, TransitionTable};

fn yes_no(text: &str) -> MessageSpec {
    MessageSpec::say(text).with_choices(["Yes", "No"])
}

fn budget_prompt() -> MessageSpec {
    yes_no("Do you have a budget range in mind for your home?").after_ms(1000)
}

fn down_payment_prompt() -> MessageSpec {
    yes_no("Do you already have a down payment saved?").after_ms(1000)
}

fn loan_preferences_prompt() -> MessageSpec {
    yes_no("Do you already know what type of loan you're considering — like FHA, Conventional, or VA?")
        .after_ms(1000)
}

fn wrap_up_prompt() -> MessageSpec {
    MessageSpec::then(
        "All set! 🎉 Based on your info, I've outlined some programs that match your situation. You can view them now or come back anytime to continue your application.",
    )
    .with_choices(["View My Matches", "Save & Exit"])
}

pub fn table() -> TransitionTable {
    TransitionTable::builder(FlowKind::FirstTimeBuyer, "welcome")
        .opening(yes_no(
            "Hi there! I'm Ellen 😊. Are you looking to buy your very first home?",
        ))
        // ── Property ────────────────────────────────────────────────────
        .on_choice(
            "welcome",
            "Yes",
            Row::to("property_interest")
                .say(MessageSpec::say(
                    "That's exciting! Buying your first home is a huge milestone. I'll walk you through each step — nice and easy.",
                ))
                .say(
                    MessageSpec::then(
                        "Do you already have a property in mind, or are you still exploring options?",
                    )
                    .with_choices(["Have a property", "Still exploring"]),
                ),
        )
        .on_choice(
            "welcome",
            "No",
            Row::to("end").say(MessageSpec::say(
                "No worries! You can still explore our other programs like refinance or government-backed loans.",
            )),
        )
        .on_choice(
            "property_interest",
            "Have a property",
            Row::to("property_type")
                .capture_fixed(fields::HAS_PROPERTY, "true")
                .say(
                    MessageSpec::say(
                        "Great! That helps me narrow things down. Is it a single-family home, condo, or townhouse?",
                    )
                    .with_choices(["Single-family home", "Condo", "Townhouse"]),
                ),
        )
        .on_choice(
            "property_interest",
            "Still exploring",
            Row::to("budget_planning")
                .capture_fixed(fields::HAS_PROPERTY, "false")
                .say(MessageSpec::say(
                    "Awesome, no rush — I can still help you figure out what fits your budget and eligibility.",
                ))
                .say(budget_prompt()),
        )
        .on_any_choice(
            "property_type",
            Row::to("budget_planning")
                .capture(fields::PROPERTY_TYPE)
                .say(MessageSpec::say("Perfect, that gives me a clear picture."))
                .say(budget_prompt()),
        )
        // ── Budget and credit ───────────────────────────────────────────
        .on_choice(
            "budget_planning",
            "Yes",
            Row::to("budget_input").say(
                MessageSpec::say("Got it! What's your estimated budget range?")
                    .with_input_prompt("Enter amount"),
            ),
        )
        .on_choice(
            "budget_planning",
            "No",
            Row::to("budget_estimate").say(yes_no(
                "No problem! Would you like me to estimate a comfortable budget based on your income and credit score?",
            )),
        )
        .on_text(
            "budget_input",
            Row::to("down_payment")
                .capture(fields::BUDGET)
                .say(MessageSpec::say(
                    "Perfect, that helps me estimate your potential loan size.",
                ))
                .say(down_payment_prompt()),
        )
        .on_choice(
            "budget_estimate",
            "Yes",
            Row::to("income_input").say(
                MessageSpec::say("Great — could you share your approximate monthly income?")
                    .with_input_prompt("Enter monthly income"),
            ),
        )
        .on_choice(
            "budget_estimate",
            "No",
            Row::to("down_payment")
                .say(MessageSpec::say(
                    "Alright, you can still explore homes, and we'll help you estimate when you're ready.",
                ))
                .say(down_payment_prompt()),
        )
        .on_text(
            "income_input",
            Row::to("credit_check")
                .capture(fields::MONTHLY_INCOME)
                .say(yes_no(
                    "Thanks! And do you know your current credit score range?",
                )),
        )
        .on_choice(
            "credit_check",
            "Yes",
            Row::to("down_payment")
                .say(MessageSpec::say(
                    "Awesome. That gives me enough to calculate a safe budget range.",
                ))
                .say(down_payment_prompt()),
        )
        .on_choice(
            "credit_check",
            "No",
            Row::to("credit_score_help").say(yes_no(
                "No problem. I can help you check your credit score securely if you'd like. Want to do that?",
            )),
        )
        .on_choice(
            "credit_score_help",
            "Yes",
            Row::to("down_payment")
                .say(MessageSpec::say(
                    "Perfect! I'll connect you to our secure checker — it'll just take a moment.",
                ))
                .say(down_payment_prompt()),
        )
        .on_choice(
            "credit_score_help",
            "No",
            Row::to("down_payment")
                .say(MessageSpec::say(
                    "That's fine! You can add it later; I'll use average credit data for now.",
                ))
                .say(down_payment_prompt()),
        )
        // ── Down payment and loan type ──────────────────────────────────
        .on_choice(
            "down_payment",
            "Yes",
            Row::to("down_payment_input").say(
                MessageSpec::say(
                    "Great! What percentage of the home price do you plan to put down?",
                )
                .with_input_prompt("Enter percentage"),
            ),
        )
        .on_choice(
            "down_payment",
            "No",
            Row::to("down_payment_assistance").say(yes_no(
                "That's totally fine. Would you like me to show you some down payment assistance programs for first-time buyers?",
            )),
        )
        .on_text(
            "down_payment_input",
            Row::to("loan_preferences")
                .capture(fields::DOWN_PAYMENT_PERCENT)
                .say(MessageSpec::say(
                    "Nice — that gives us more flexibility with loan options.",
                ))
                .say(loan_preferences_prompt()),
        )
        .on_choice(
            "down_payment_assistance",
            "Yes",
            Row::to("loan_preferences")
                .say(MessageSpec::say(
                    "Perfect! We'll go over the most common ones available in your state.",
                ))
                .say(loan_preferences_prompt()),
        )
        .on_choice(
            "down_payment_assistance",
            "No",
            Row::to("loan_preferences")
                .say(MessageSpec::say(
                    "No problem — we'll continue with other financing options.",
                ))
                .say(loan_preferences_prompt()),
        )
        .on_choice(
            "loan_preferences",
            "Yes",
            Row::to("timeline")
                .say(MessageSpec::say(
                    "Perfect, that'll help narrow the best rate options for you.",
                ))
                .say(
                    MessageSpec::then("When do you plan to purchase your home?")
                        .with_choices(["0-3 months", "3-6 months", "6+ months"]),
                ),
        )
        .on_choice(
            "loan_preferences",
            "No",
            Row::to("timeline")
                .say(MessageSpec::say(
                    "No problem! I can explain each one briefly so you can decide later.",
                ))
                .say(
                    MessageSpec::then("When do you plan to purchase your home?")
                        .with_choices(["0-3 months", "3-6 months", "6+ months"]),
                ),
        )
        // ── Pre-approval ────────────────────────────────────────────────
        .on_any_choice(
            "timeline",
            Row::to("pre_approval")
                .capture(fields::TIMELINE)
                .say(MessageSpec::say(
                    "Got it! That helps me understand your readiness and program availability.",
                ))
                .say(
                    yes_no("Would you like to get pre-approved for your mortgage today?")
                        .after_ms(1000),
                ),
        )
        .on_choice(
            "pre_approval",
            "Yes",
            Row::to("pre_approval_ready").say(yes_no(
                "Great choice! To start pre-approval, I'll need a few quick details — ID verification, proof of income, and consent to check credit. Ready to begin?",
            )),
        )
        .on_choice(
            "pre_approval",
            "No",
            Row::to("updates").say(yes_no(
                "That's totally fine! Would you like me to keep you updated with homebuyer tips and first-time buyer programs?",
            )),
        )
        .on_choice(
            "pre_approval_ready",
            "Yes",
            Row::to("login_required").say(
                MessageSpec::say(
                    "Before we continue, please log in or create an account so I can save your progress and personalized results.",
                )
                .with_choices(["Login", "Create Account"]),
            ),
        )
        .on_choice(
            "pre_approval_ready",
            "No",
            Row::to("wrap_up")
                .say(MessageSpec::say(
                    "Okay, you can always come back when you're ready.",
                ))
                .say(wrap_up_prompt()),
        )
        .on_choice(
            "login_required",
            "Login",
            Row::to("login_required").defer(Handoff::Auth(AuthAction::Login)),
        )
        .on_choice(
            "login_required",
            "Create Account",
            Row::to("login_required").defer(Handoff::Auth(AuthAction::CreateAccount)),
        )
        .on_choice(
            "updates",
            "Yes",
            Row::to("wrap_up")
                .say(MessageSpec::say(
                    "Perfect! I'll send you helpful updates to your email.",
                ))
                .say(wrap_up_prompt()),
        )
        .on_choice(
            "updates",
            "No",
            Row::to("wrap_up")
                .say(MessageSpec::say(
                    "Alright! You can revisit anytime — I'll be right here.",
                ))
                .say(wrap_up_prompt()),
        )
        // ── Wrap-up ─────────────────────────────────────────────────────
        .on_choice(
            "wrap_up",
            "View My Matches",
            Row::to("end").defer(Handoff::Host("view-matches".to_string())),
        )
        .on_choice(
            "wrap_up",
            "Save & Exit",
            Row::to("end").defer(Handoff::Host("save-and-exit".to_string())),
        )
        .build()
}
