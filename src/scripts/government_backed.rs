//! Government-backed loans: FHA, VA and USDA eligibility.

use crate::chat::model::{AuthAction, FlowKind, Handoff, MessageSpec};
use crate::chat::state::fields;
use crate::chat::table::{Goto, Row, TransitionTable};

fn yes_no(text: &str) -> MessageSpec {
    MessageSpec::say(text).with_choices(["Yes", "No"])
}

fn program_prompt() -> MessageSpec {
    MessageSpec::then(
        "Do you have a specific program in mind — FHA, VA, or USDA — or would you like me to recommend the best one?",
    )
    .with_choices(["FHA", "VA", "USDA", "Not sure / Recommend"])
}

fn general_info_prompt() -> MessageSpec {
    MessageSpec::say(
        "Okay — we can still show general program info. Would you like general details or to continue without checks?",
    )
    .with_choices(["Show general details", "Continue without checks"])
}

fn property_prompt() -> MessageSpec {
    MessageSpec::then(
        "Is the property a single-family home, condo, or multi-unit property (2–4 units)?",
    )
    .with_choices(["Single-family", "Condo", "2-4 units"])
}

fn down_payment_prompt() -> MessageSpec {
    MessageSpec::then("Do you plan to put down less than 20%?").with_choices(["Yes", "No", "Not sure"])
}

fn timeline_prompt() -> MessageSpec {
    MessageSpec::then(
        "When do you plan to buy or refinance? This helps match you to available programs.",
    )
    .with_choices(["0-3 months", "3-6 months", "6+ months", "Just exploring"])
}

fn wrap_up_prompt() -> MessageSpec {
    MessageSpec::then("All set for now, {{ firstName }}! Here's what I can do next for you:")
        .with_choices([
            "View eligibility summary & program details",
            "Get a rough estimate (no login)",
            "Save and continue later (requires login)",
            "Connect with a mortgage advisor",
        ])
}

/// After the credit-check question, continue with the program captured earlier.
fn continue_to_program(ack: &str) -> Row {
    Row::branch(
        fields::PROGRAM,
        vec![
            (
                "FHA",
                Goto::to("fha_credit_score").say(
                    MessageSpec::then(
                        "FHA loans allow down payments starting at 3.5% and are more flexible on credit. Quick question — is your credit score above 580?",
                    )
                    .with_choices(["Yes", "No", "Not sure"]),
                ),
            ),
            (
                "VA",
                Goto::to("va_eligible").say(
                    MessageSpec::then(
                        "VA loans often require no down payment and no PMI. Are you an eligible veteran, active duty service member, or spouse of someone eligible?",
                    )
                    .with_choices([
                        "Yes — I'm eligible",
                        "I'm not sure / Need help confirming",
                        "No",
                    ]),
                ),
            ),
            (
                "USDA",
                Goto::to("usda_rural").say(
                    MessageSpec::then(
                        "USDA loans require the property to be in an eligible rural area and household income to be within limits. Is the property you're considering in a rural area or small town?",
                    )
                    .with_choices(["Yes", "No", "Not sure"]),
                ),
            ),
        ],
        Goto::to("property_type").say(property_prompt()),
    )
    .say(MessageSpec::say(ack))
}

pub fn table() -> TransitionTable {
    let mut b = TransitionTable::builder(FlowKind::GovernmentBacked, "greeting")
        .opening(yes_no(
            "Hi {{ firstName }} 👋 — I can help with government-backed loans like FHA, VA, or USDA. Are you interested in a government-backed loan today?",
        ))
        // ── Opening ─────────────────────────────────────────────────────
        .on_choice(
            "greeting",
            "Yes",
            Row::to("purpose")
                .say(MessageSpec::say(
                    "Awesome — I'll walk you through quick eligibility checks and options. Quick note: I'll ask a few short questions to find the best fit.",
                ))
                .say(
                    MessageSpec::then(
                        "Is this for a purchase or for refinancing an existing mortgage?",
                    )
                    .with_choices(["Purchase", "Refinance", "Not sure"]),
                ),
        )
        .on_choice(
            "greeting",
            "No",
            Row::to("other_services").say(
                MessageSpec::say(
                    "No problem! Would you like to explore our other mortgage services instead? (You can always come back to government-backed loans.)",
                )
                .with_choices(["Show other services", "Not right now"]),
            ),
        )
        .on_choice(
            "other_services",
            "Show other services",
            Row::to("end").say(MessageSpec::say(
                "Here are the other services — pick one when you're ready.",
            )),
        )
        .on_choice(
            "other_services",
            "Not right now",
            Row::to("end").say(MessageSpec::say(
                "Alright — you can return anytime. I'll be here.",
            )),
        )
        .on_choice(
            "purpose",
            "Purchase",
            Row::to("program_selection")
                .capture(fields::PURPOSE)
                .say(MessageSpec::say(
                    "Great — government programs often help buyers with lower down payments. Let's check eligibility.",
                ))
                .say(program_prompt()),
        )
        .on_choice(
            "purpose",
            "Refinance",
            Row::to("program_selection")
                .capture(fields::PURPOSE)
                .say(MessageSpec::say(
                    "Got it — we can also check if a government-backed refinance (if available) or other refinance options are a better fit. Want to continue?",
                ))
                .say(program_prompt()),
        )
        .on_any_choice(
            "purpose",
            Row::to("program_selection")
                .capture(fields::PURPOSE)
                .say(MessageSpec::say(
                    "No worries — I'll ask a few questions and then suggest the best path.",
                ))
                .say(program_prompt()),
        )
        // ── Program selection ───────────────────────────────────────────
        .on_choice(
            "program_selection",
            "FHA",
            Row::to("fha_check").capture(fields::PROGRAM).say(yes_no(
                "FHA loans often allow low down payments (as low as 3.5%) and are friendly to buyers with lower credit scores. Shall I check your likely FHA eligibility?",
            )),
        )
        .on_choice(
            "program_selection",
            "VA",
            Row::to("va_check").capture(fields::PROGRAM).say(yes_no(
                "VA loans are for eligible veterans and active military members — often no down payment and no PMI. Do you or a family member have military service?",
            )),
        )
        .on_choice(
            "program_selection",
            "USDA",
            Row::to("usda_check").capture(fields::PROGRAM).say(yes_no(
                "USDA loans are for eligible rural properties and often have no down payment but have income limits. Is the property in a rural area or small town?",
            )),
        )
        .on_any_choice(
            "program_selection",
            Row::to("eligibility_consent")
                .capture(fields::PROGRAM)
                .say(yes_no(
                    "No problem — I'll recommend the best option based on a few quick eligibility checks. Shall we proceed?",
                )),
        );

    for step in ["fha_check", "va_check", "usda_check"] {
        b = b
            .on_choice(
                step,
                "Yes",
                Row::to("eligibility_consent").say(yes_no(
                    "Can I ask a couple of short questions about your income and credit so I can recommend the right program?",
                )),
            )
            .on_choice(step, "No", Row::to("general_info").say(general_info_prompt()));
    }

    b = b
        .on_choice(
            "general_info",
            "Show general details",
            Row::to("end").say(MessageSpec::say(
                "I'll show basic program overviews (FHA, VA, USDA) so you can learn more.",
            )),
        )
        .on_choice(
            "general_info",
            "Continue without checks",
            Row::to("property_type")
                .say(MessageSpec::say(
                    "Alright — I'll proceed using general rules and follow-up questions.",
                ))
                .say(property_prompt()),
        )
        // ── Income and credit ───────────────────────────────────────────
        .on_choice(
            "eligibility_consent",
            "Yes",
            Row::to("income_input").say(MessageSpec::say(
                "What is your approximate annual income before taxes? (You can round.)",
            )),
        )
        .on_choice(
            "eligibility_consent",
            "No",
            Row::to("general_info").say(general_info_prompt()),
        )
        .on_text(
            "income_input",
            Row::to("credit_check_consent")
                .capture(fields::INCOME)
                .say(
                    MessageSpec::say(
                        "Thanks — do you consent to a secure soft credit check to estimate program eligibility? (This won't affect your score.)",
                    )
                    .with_choices(["Yes (soft check)", "No (skip)"]),
                ),
        )
        .on_choice(
            "credit_check_consent",
            "Yes (soft check)",
            continue_to_program(
                "Perfect — I'll run a soft check and use the result to match programs. This takes just a moment.",
            ),
        )
        .on_any_choice(
            "credit_check_consent",
            continue_to_program(
                "No problem — I'll continue using the income info and general guidelines. You can always consent later for a more accurate match.",
            ),
        )
        // ── FHA ─────────────────────────────────────────────────────────
        .on_choice(
            "fha_credit_score",
            "Yes",
            Row::to("fha_estimate").say(yes_no(
                "Great — with a score above 580 you're likely eligible for the 3.5% down payment option. Would you like an estimate of monthly payments using that down payment?",
            )),
        )
        .on_choice(
            "fha_credit_score",
            "No",
            Row::to("fha_lower_score").say(yes_no(
                "Even if your score is 500–579, some lenders accept FHA with a larger down payment. Would you like info on those options?",
            )),
        )
        .on_any_choice(
            "fha_credit_score",
            Row::to("credit_score_help").say(yes_no(
                "Want me to help you check your score securely now? It's a soft check and won't affect your credit.",
            )),
        );

    for step in ["fha_estimate", "fha_lower_score", "credit_score_help"] {
        b = b
            .on_choice(
                step,
                "Yes",
                Row::to("property_type")
                    .say(MessageSpec::say("Great! I'll prepare that information for you."))
                    .say(property_prompt()),
            )
            .on_choice(
                step,
                "No",
                Row::to("property_type")
                    .say(MessageSpec::say("No problem. Let's continue with other details."))
                    .say(property_prompt()),
            );
    }

    // ── VA ──────────────────────────────────────────────────────────────
    b = b
        .on_choice(
            "va_eligible",
            "Yes — I'm eligible",
            Row::to("va_coe").say(yes_no(
                "Fantastic — VA loans could be a great fit. Do you already have your Certificate of Eligibility (COE)?",
            )),
        )
        .on_choice(
            "va_eligible",
            "I'm not sure / Need help confirming",
            Row::to("va_help").say(yes_no(
                "I can help check your eligibility quickly. Do you want to proceed?",
            )),
        )
        .on_any_choice(
            "va_eligible",
            Row::to("property_type")
                .say(MessageSpec::say(
                    "Okay — we'll look at FHA or conventional options that suit your profile.",
                ))
                .say(property_prompt()),
        )
        .on_choice(
            "va_coe",
            "Yes",
            Row::to("va_preapproval").say(yes_no(
                "Perfect — we can proceed to a VA-specific pre-approval check when you're ready. Would you like that?",
            )),
        )
        .on_choice(
            "va_coe",
            "No",
            Row::to("va_coe_help").say(yes_no(
                "No problem — I can guide you through getting a COE. Want help now?",
            )),
        )
        // ── USDA ────────────────────────────────────────────────────────
        .on_choice(
            "usda_rural",
            "Yes",
            Row::to("usda_income").say(
                MessageSpec::say(
                    "Great — next: does your household income fall within the USDA income limits for your area? (I can help check if you want.)",
                )
                .with_choices(["Yes", "No", "Help me check"]),
            ),
        )
        .on_choice(
            "usda_rural",
            "No",
            Row::to("usda_alternatives").say(yes_no(
                "You likely won't qualify for USDA, but FHA or conventional loans may still fit. Want to review those?",
            )),
        )
        .on_any_choice(
            "usda_rural",
            Row::to("usda_zip_check").say(yes_no(
                "I can estimate eligibility for your ZIP code. Want me to check?",
            )),
        );

    for step in [
        "va_preapproval",
        "va_coe_help",
        "va_help",
        "usda_income",
        "usda_alternatives",
        "usda_zip_check",
    ] {
        b = b.on_any_choice(step, Row::to("property_type").say(property_prompt()));
    }

    // ── Property and down payment ───────────────────────────────────────
    b = b
        .on_choice(
            "property_type",
            "Condo",
            Row::to("condo_approval")
                .capture(fields::PROPERTY_TYPE)
                .say(
                    MessageSpec::say(
                        "Some programs have condo requirements. Do you know if the condo project is FHA/VA-approved?",
                    )
                    .with_choices(["Yes", "No", "Not sure"]),
                ),
        )
        .on_choice(
            "property_type",
            "2-4 units",
            Row::to("multi_unit").capture(fields::PROPERTY_TYPE).say(yes_no(
                "Certain programs treat 2–4 unit properties differently (income from units may help qualify). Want to use rental income in the estimate?",
            )),
        )
        .on_any_choice(
            "property_type",
            Row::to("down_payment")
                .capture(fields::PROPERTY_TYPE)
                .say(down_payment_prompt()),
        )
        .on_any_choice("condo_approval", Row::to("down_payment").say(down_payment_prompt()))
        .on_any_choice("multi_unit", Row::to("down_payment").say(down_payment_prompt()))
        .on_choice(
            "down_payment",
            "Yes",
            Row::to("down_payment_estimate").say(yes_no(
                "Okay — some government programs allow very low down payments; FHA and USDA can be helpful. Would you like an estimated monthly payment with a low down payment?",
            )),
        )
        .on_choice(
            "down_payment",
            "No",
            Row::to("down_payment_20plus").say(yes_no(
                "Great — with 20% or more down, you may avoid PMI and get better rates. Want to see options tailored for that?",
            )),
        )
        .on_any_choice(
            "down_payment",
            Row::to("down_payment_input").say(MessageSpec::say(
                "No problem — what amount can you put down today? (If unsure, enter an approximate percentage.)",
            )),
        )
        .on_text(
            "down_payment_input",
            Row::to("timeline")
                .capture(fields::DOWN_PAYMENT)
                .say(timeline_prompt()),
        )
        .on_any_choice("down_payment_estimate", Row::to("timeline").say(timeline_prompt()))
        .on_any_choice("down_payment_20plus", Row::to("timeline").say(timeline_prompt()))
        // ── Timeline and pre-approval ───────────────────────────────────
        .on_any_choice(
            "timeline",
            Row::to("pre_approval")
                .capture(fields::TIMELINE)
                .say(MessageSpec::say(
                    "Thanks — that helps. I'll tailor recommendations based on timing.",
                ))
                .say(
                    MessageSpec::then(
                        "Based on what you've shared, I can create a personalized eligibility summary and—if you want—a pre-approval estimate. Would you like me to prepare that now?",
                    )
                    .with_choices([
                        "Yes — prepare estimate",
                        "No — show summary only",
                        "Not yet",
                    ]),
                ),
        )
        .on_choice(
            "pre_approval",
            "Yes — prepare estimate",
            Row::to("login_trigger").say(
                MessageSpec::say(
                    "Before we proceed to generate a pre-approval estimate and save your results, please log in or create an account. This keeps your data secure and lets you pick up later. Would you like to Log in or Create account now?",
                )
                .with_choices(["Log in", "Create account", "Maybe later"]),
            ),
        )
        .on_choice(
            "pre_approval",
            "No — show summary only",
            Row::to("wrap_up")
                .say(MessageSpec::say(
                    "Sure — I'll show a summary of programs and eligibility based on the info you gave. You can log in anytime to get an official pre-approval.",
                ))
                .say(wrap_up_prompt()),
        )
        .on_any_choice(
            "pre_approval",
            Row::to("tips").say(yes_no(
                "No rush — I'll keep this session active for now. Want tips on improving eligibility while you prepare?",
            )),
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
        .on_any_choice(
            "login_trigger",
            Row::to("rough_estimate").say(yes_no(
                "Okay — I'll hold off. I can still show a non-saved estimate (approximate). Would you like that?",
            )),
        )
        .on_any_choice("rough_estimate", Row::to("wrap_up").say(wrap_up_prompt()))
        .on_any_choice("tips", Row::to("wrap_up").say(wrap_up_prompt()))
        // ── Wrap-up ─────────────────────────────────────────────────────
        .on_choice(
            "wrap_up",
            "View eligibility summary & program details",
            Row::to("end").defer(Handoff::Host("eligibility-summary".to_string())),
        )
        .on_choice(
            "wrap_up",
            "Get a rough estimate (no login)",
            Row::to("end").defer(Handoff::Host("rough-estimate".to_string())),
        )
        .on_choice(
            "wrap_up",
            "Save and continue later (requires login)",
            Row::to("end").defer(Handoff::Auth(AuthAction::Login)),
        )
        .on_choice(
            "wrap_up",
            "Connect with a mortgage advisor",
            Row::to("end").defer(Handoff::Host("advisor".to_string())),
        );

    b.build()
}
