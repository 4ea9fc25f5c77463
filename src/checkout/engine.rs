//! The conversational checkout state machine.
//!
//! One [`Engine`] instance serves every chat. `handle` takes a decoded
//! [`Event`], looks up the chat's [`Session`], and drives the conversation:
//! the password gate, catalog browsing, the purchase flow, proof collection,
//! and the off-script fallbacks. All chat output goes through the [`Channel`]
//! trait so the whole machine is testable without a live transport.

use crate::{
    checkout::{
        channel::{Button, Channel, ImageSource, Keyboard, MessageHandle},
        event::{CallbackAction, Command, Event, ImageRef, MenuButton},
        session::{CheckoutState, Session, SessionStore},
    },
    config::AppConfig,
    core::{self, user::ChatProfile},
    entities::{PaymentMethod, User, course, payment, user},
    errors::{Error, Result},
    util,
};
use sea_orm::{DatabaseConnection, EntityTrait};

const HELP_TEXT: &str = "Available commands:\n\
    /courses - Browse all courses\n\
    /categories - Browse by category\n\
    /search - Search for a course\n\
    /purchases - Your purchased courses\n\
    /policy - Store policy\n\
    /request - Request a course we don't have\n\
    /cancel - Cancel the current action";

pub struct Engine<C> {
    db: DatabaseConnection,
    config: AppConfig,
    channel: C,
    sessions: SessionStore,
}

impl<C: Channel> Engine<C> {
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig, channel: C) -> Self {
        let sessions = SessionStore::new(config.session_ttl, config.session_capacity);
        Self {
            db,
            config,
            channel,
            sessions,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Applies one decoded event for a chat. Events for the same chat are
    /// serialized on the session lock; different chats proceed in parallel.
    pub async fn handle(&self, chat_id: i64, profile: &ChatProfile, event: Event) -> Result<()> {
        let user = core::user::get_or_create(&self.db, profile).await?;
        let session = self.sessions.get(chat_id).await;
        let mut session = session.lock().await;

        if !session.verified && !self.pass_gate(chat_id, &user, &mut session, &event).await? {
            return Ok(());
        }

        match event {
            Event::Command(command) => {
                self.handle_command(chat_id, &user, &mut session, command).await
            }
            Event::MenuButton(button) => {
                self.handle_menu_button(chat_id, &user, &mut session, button).await
            }
            Event::Callback(action, source) => {
                self.handle_callback(chat_id, &user, &mut session, action, source).await
            }
            Event::Text(text) => self.handle_text(chat_id, &user, &mut session, &text).await,
            Event::Photo(image) => self.handle_photo(chat_id, &user, &mut session, &image).await,
        }
    }

    /// Runs the password gate. Returns true when the event may continue into
    /// the normal dispatch, false when the gate consumed it.
    async fn pass_gate(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        event: &Event,
    ) -> Result<bool> {
        let Some(password) = &self.config.bot_password else {
            session.verified = true;
            return Ok(true);
        };

        if let Event::Text(text) = event {
            if session.state == CheckoutState::AwaitingPassword {
                if text.trim() == password {
                    session.verified = true;
                    session.state = CheckoutState::Idle;
                    core::log::record(&self.db, Some(&user.telegram_id), "password_accepted", None)
                        .await?;
                    self.send_welcome(chat_id).await?;
                } else {
                    core::log::record(&self.db, Some(&user.telegram_id), "password_rejected", None)
                        .await?;
                    self.channel
                        .send_text(chat_id, "❌ Wrong password. Try again:", None)
                        .await?;
                }
                return Ok(false);
            }
        }

        session.state = CheckoutState::AwaitingPassword;
        self.channel
            .send_text(
                chat_id,
                "🔒 This store is password protected. Please enter the password:",
                None,
            )
            .await?;
        Ok(false)
    }

    async fn handle_command(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        command: Command,
    ) -> Result<()> {
        match command {
            Command::Start => {
                session.state = CheckoutState::Idle;
                self.send_welcome(chat_id).await
            }
            Command::Help => {
                let handle = self
                    .channel
                    .send_text(chat_id, HELP_TEXT, Some(Keyboard::MainMenu))
                    .await?;
                self.schedule_cleanup(chat_id, handle).await;
                Ok(())
            }
            Command::Courses => self.show_courses(chat_id, session, None).await,
            Command::Categories => self.show_category_menu(chat_id).await,
            Command::Search => self.prompt_search(chat_id, session).await,
            Command::Purchases => self.show_purchases(chat_id, user).await,
            Command::Policy => self.show_policy(chat_id).await,
            Command::Request => self.prompt_course_request(chat_id, session).await,
            Command::Cancel => self.cancel(chat_id, session).await,
        }
    }

    async fn handle_menu_button(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        button: MenuButton,
    ) -> Result<()> {
        let command = match button {
            MenuButton::Courses => Command::Courses,
            MenuButton::Categories => Command::Categories,
            MenuButton::Search => Command::Search,
            MenuButton::Purchases => Command::Purchases,
            MenuButton::Policy => Command::Policy,
            MenuButton::RequestCourse => Command::Request,
            MenuButton::Cancel => Command::Cancel,
        };
        self.handle_command(chat_id, user, session, command).await
    }

    async fn handle_callback(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        action: CallbackAction,
        source: Option<MessageHandle>,
    ) -> Result<()> {
        match action {
            CallbackAction::ViewCourse(course_id) => {
                self.show_course_detail(chat_id, course_id).await
            }
            CallbackAction::Buy(course_id) => {
                self.begin_purchase(chat_id, user, session, course_id).await
            }
            CallbackAction::SelectPayment(method, course_id) => {
                self.select_payment(chat_id, session, method, course_id).await
            }
            CallbackAction::CategoryCourses(category_id) => {
                self.show_category_courses(chat_id, session, category_id).await
            }
            CallbackAction::ShowCategoryMenu => self.show_category_menu(chat_id).await,
            CallbackAction::BackToCourses | CallbackAction::Back => {
                self.show_courses(chat_id, session, source).await
            }
            CallbackAction::Cancel => {
                session.state = CheckoutState::Idle;
                match source {
                    // Rewrite the screen the button was on instead of
                    // stacking a new message
                    Some(handle) => {
                        self.channel
                            .edit_text(chat_id, handle, "Cancelled.", None)
                            .await
                    }
                    None => {
                        self.channel
                            .send_text(chat_id, "Cancelled.", Some(Keyboard::MainMenu))
                            .await?;
                        Ok(())
                    }
                }
            }
        }
    }

    async fn handle_text(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        text: &str,
    ) -> Result<()> {
        match session.state {
            CheckoutState::Searching => self.run_search(chat_id, user, session, text).await,
            CheckoutState::AwaitingGiftCode { course_id } => {
                self.submit_gift_code(chat_id, user, session, course_id, text).await
            }
            CheckoutState::AwaitingCourseRequest => {
                self.submit_course_request(chat_id, user, session, text).await
            }
            CheckoutState::AwaitingProof { .. } => {
                self.channel
                    .send_text(
                        chat_id,
                        "Please send your payment proof as a photo, or press ❌ Cancel.",
                        Some(Keyboard::RequestCancel),
                    )
                    .await?;
                Ok(())
            }
            CheckoutState::Idle
            | CheckoutState::AwaitingPassword
            | CheckoutState::ViewingCourses
            | CheckoutState::SelectingPayment { .. } => {
                self.handle_idle_text(chat_id, user, text).await
            }
        }
    }

    /// Free text the flow did not ask for: spam is logged and dropped,
    /// everything else gets a nudge toward the menu.
    async fn handle_idle_text(
        &self,
        chat_id: i64,
        user: &user::Model,
        text: &str,
    ) -> Result<()> {
        if util::is_spam(text) {
            let preview: String = text.chars().take(200).collect();
            core::log::record(
                &self.db,
                Some(&user.telegram_id),
                "spam_detected",
                Some(&preview),
            )
            .await?;
            tracing::info!(telegram_id = %user.telegram_id, "dropped spam message");
            return Ok(());
        }

        self.channel
            .send_text(
                chat_id,
                "I didn't understand that. Use the menu below or /help.",
                Some(Keyboard::MainMenu),
            )
            .await?;
        Ok(())
    }

    async fn handle_photo(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        image: &ImageRef,
    ) -> Result<()> {
        let CheckoutState::AwaitingProof { course_id, method } = session.state else {
            self.channel
                .send_text(
                    chat_id,
                    "I wasn't expecting a photo. To buy a course, pick one from 📚 Courses first.",
                    Some(Keyboard::MainMenu),
                )
                .await?;
            return Ok(());
        };

        self.process_proof(chat_id, user, session, course_id, method, image).await
    }

    async fn send_welcome(&self, chat_id: i64) -> Result<()> {
        self.channel
            .send_text(chat_id, &self.config.welcome_message, Some(Keyboard::MainMenu))
            .await?;
        Ok(())
    }

    /// Shows the active course listing, editing `edit` in place when the
    /// buyer navigated here from an inline button.
    async fn show_courses(
        &self,
        chat_id: i64,
        session: &mut Session,
        edit: Option<MessageHandle>,
    ) -> Result<()> {
        let courses = core::course::list_active(&self.db).await?;
        if courses.is_empty() {
            self.channel
                .send_text(chat_id, "No courses are available right now.", Some(Keyboard::MainMenu))
                .await?;
            return Ok(());
        }

        let mut rows: Vec<Vec<Button>> = courses
            .iter()
            .map(|course| {
                vec![Button::callback(
                    format!("{} — {}", course.title, price_tag(course)),
                    CallbackAction::ViewCourse(course.id),
                )]
            })
            .collect();
        rows.push(vec![Button::callback(
            "🗂 Browse by category",
            CallbackAction::ShowCategoryMenu,
        )]);

        session.state = CheckoutState::ViewingCourses;
        let text = "📚 Available Courses:";
        let keyboard = Some(Keyboard::Inline(rows));
        match edit {
            Some(handle) => self.channel.edit_text(chat_id, handle, text, keyboard).await?,
            None => {
                let handle = self.channel.send_text(chat_id, text, keyboard).await?;
                self.schedule_cleanup(chat_id, handle).await;
            }
        }
        Ok(())
    }

    async fn show_course_detail(&self, chat_id: i64, course_id: i32) -> Result<()> {
        let Some(course) = core::course::get_active(&self.db, course_id).await? else {
            return self.course_unavailable(chat_id).await;
        };

        let mut text = format!("📘 {}\n", course.title);
        if let Some(description) = &course.description {
            text.push_str(&format!("\n{description}\n"));
        }
        text.push_str(&format!("\nPrice: {}", price_tag(&course)));

        let buy_label = if course.is_free {
            "📥 Get for free".to_string()
        } else {
            format!("🛒 Buy — {}", price_tag(&course))
        };
        let mut rows = vec![vec![Button::callback(buy_label, CallbackAction::Buy(course.id))]];
        if let Some(demo) = &course.demo_video_link {
            rows.push(vec![Button::link("🎬 Watch demo", demo.clone())]);
        }
        rows.push(vec![Button::callback("⬅️ Back", CallbackAction::BackToCourses)]);
        let keyboard = Some(Keyboard::Inline(rows));

        if let Some(image) = &course.image_link {
            let sent = self
                .channel
                .send_image(chat_id, &ImageSource::Url(image.clone()), &text, keyboard.clone())
                .await;
            match sent {
                Ok(_) => return Ok(()),
                Err(error) => {
                    // Broken image links must not hide the course
                    tracing::warn!(%error, course_id = course.id, "course image send failed");
                }
            }
        }
        self.channel.send_text(chat_id, &text, keyboard).await?;
        Ok(())
    }

    async fn begin_purchase(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        course_id: i32,
    ) -> Result<()> {
        let Some(course) = core::course::get_active(&self.db, course_id).await? else {
            return self.course_unavailable(chat_id).await;
        };

        if core::payment::has_approved_purchase(&self.db, user.id, course.id).await? {
            self.channel
                .send_text(chat_id, "You already own this course. Here it is again:", None)
                .await?;
            return self.deliver_course(chat_id, user, &course).await;
        }

        if course.is_free {
            core::log::record(
                &self.db,
                Some(&user.telegram_id),
                "free_course_delivered",
                Some(&course.title),
            )
            .await?;
            return self.deliver_course(chat_id, user, &course).await;
        }

        let methods = core::course::eligible_payment_methods(&course, &self.config.payments);
        if methods.is_empty() {
            self.channel
                .send_text(
                    chat_id,
                    "No payment methods are available right now. Please try again later.",
                    Some(Keyboard::MainMenu),
                )
                .await?;
            return Ok(());
        }

        let mut rows: Vec<Vec<Button>> = methods
            .into_iter()
            .map(|method| {
                vec![Button::callback(
                    method.label(),
                    CallbackAction::SelectPayment(method, course.id),
                )]
            })
            .collect();
        rows.push(vec![Button::callback("❌ Cancel", CallbackAction::Cancel)]);

        session.state = CheckoutState::SelectingPayment { course_id: course.id };
        self.channel
            .send_text(
                chat_id,
                &format!(
                    "How would you like to pay for {} ({})?",
                    course.title,
                    price_tag(&course)
                ),
                Some(Keyboard::Inline(rows)),
            )
            .await?;
        Ok(())
    }

    async fn select_payment(
        &self,
        chat_id: i64,
        session: &mut Session,
        method: PaymentMethod,
        course_id: i32,
    ) -> Result<()> {
        let Some(course) = core::course::get_active(&self.db, course_id).await? else {
            return self.course_unavailable(chat_id).await;
        };

        let instructions = self.config.payments.instructions_for(method);

        if method == PaymentMethod::Gift {
            session.state = CheckoutState::AwaitingGiftCode { course_id };
            self.channel
                .send_text(chat_id, &instructions, Some(Keyboard::RequestCancel))
                .await?;
            return Ok(());
        }

        session.state = CheckoutState::AwaitingProof { course_id, method };
        let text = format!(
            "{instructions}\n\nAmount: {}\n\nAfter paying, send a screenshot of the payment \
             as a photo.",
            price_tag(&course)
        );

        // UPI payments can carry a scannable QR image on the course
        if let (PaymentMethod::Upi, Some(qr)) = (&method, &course.qr_code_image) {
            let sent = self
                .channel
                .send_image(
                    chat_id,
                    &ImageSource::Url(qr.clone()),
                    &text,
                    Some(Keyboard::RequestCancel),
                )
                .await;
            match sent {
                Ok(_) => return Ok(()),
                Err(error) => {
                    tracing::warn!(%error, course_id = course.id, "QR image send failed");
                }
            }
        }
        self.channel
            .send_text(chat_id, &text, Some(Keyboard::RequestCancel))
            .await?;
        Ok(())
    }

    async fn process_proof(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        course_id: i32,
        method: PaymentMethod,
        image: &ImageRef,
    ) -> Result<()> {
        // The course was active when checkout started; a concurrent disable
        // should not strand a paying buyer, so look it up without the flag.
        let Some(course) = core::course::get_by_id(&self.db, course_id).await? else {
            session.state = CheckoutState::Idle;
            return self.course_unavailable(chat_id).await;
        };

        let bytes = self.channel.download_image(image).await?;
        if !util::is_valid_image(&bytes) {
            self.channel
                .send_text(
                    chat_id,
                    "That file doesn't look like an image. Please send a screenshot photo.",
                    Some(Keyboard::RequestCancel),
                )
                .await?;
            return Ok(());
        }

        // Refuse duplicates before the image touches disk so a rejected
        // resubmission leaves no orphan file
        let hash = util::fingerprint(&bytes);
        if core::payment::is_duplicate_proof(&self.db, user.id, &hash).await? {
            self.channel
                .send_text(
                    chat_id,
                    "⚠️ You've already submitted this screenshot. Please send a new \
                     payment proof.",
                    Some(Keyboard::RequestCancel),
                )
                .await?;
            return Ok(());
        }

        let filename =
            util::save_proof_image(&self.config.upload_dir, &user.telegram_id, &bytes).await?;
        let payment = core::payment::submit_proof(
            &self.db,
            user.id,
            course.id,
            method,
            course.price,
            &filename,
            &hash,
        )
        .await?;

        core::log::record(
            &self.db,
            Some(&user.telegram_id),
            "payment_submitted",
            Some(&format!("payment {} for course {}", payment.id, course.id)),
        )
        .await?;
        session.state = CheckoutState::Idle;

        if self.config.auto_approve {
            core::payment::approve(&self.db, payment.id).await?;
            self.channel
                .send_text(chat_id, "✅ Payment received! Delivering your course...", None)
                .await?;
            return self.deliver_course(chat_id, user, &course).await;
        }

        self.notify_admins(&format!(
            "🧾 New payment #{} awaiting review:\n{} — {} via {}\nFrom: {}\n\
             Use /approve {} or /reject {}",
            payment.id,
            course.title,
            price_tag(&course),
            method.label(),
            user.telegram_id,
            payment.id,
            payment.id,
        ))
        .await;

        self.channel
            .send_text(
                chat_id,
                "✅ Proof received! Your payment is under review. You'll get the course as \
                 soon as it's approved.",
                Some(Keyboard::MainMenu),
            )
            .await?;
        Ok(())
    }

    async fn submit_gift_code(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        course_id: i32,
        code: &str,
    ) -> Result<()> {
        let Some(course) = core::course::get_by_id(&self.db, course_id).await? else {
            session.state = CheckoutState::Idle;
            return self.course_unavailable(chat_id).await;
        };

        let payment = match core::payment::submit_gift_code(
            &self.db,
            user.id,
            course.id,
            course.price,
            code,
        )
        .await
        {
            Ok(payment) => payment,
            Err(Error::Validation { .. }) => {
                self.channel
                    .send_text(
                        chat_id,
                        "Please enter your gift card code, or press ❌ Cancel.",
                        Some(Keyboard::RequestCancel),
                    )
                    .await?;
                return Ok(());
            }
            Err(error) => return Err(error),
        };

        core::log::record(
            &self.db,
            Some(&user.telegram_id),
            "gift_code_submitted",
            Some(&format!("payment {} for course {}", payment.id, course.id)),
        )
        .await?;
        session.state = CheckoutState::Idle;

        // Gift codes are never auto-approved; someone has to check the code
        self.notify_admins(&format!(
            "🎁 Gift card payment #{} awaiting review:\n{} — {}\nFrom: {}\n\
             Use /approve {} or /reject {}",
            payment.id,
            course.title,
            price_tag(&course),
            user.telegram_id,
            payment.id,
            payment.id,
        ))
        .await;

        self.channel
            .send_text(
                chat_id,
                "🎁 Gift card received! You'll get the course once the code is verified.",
                Some(Keyboard::MainMenu),
            )
            .await?;
        Ok(())
    }

    async fn prompt_search(&self, chat_id: i64, session: &mut Session) -> Result<()> {
        session.state = CheckoutState::Searching;
        self.channel
            .send_text(
                chat_id,
                "🔍 Send me a keyword and I'll search titles and categories:",
                Some(Keyboard::RequestCancel),
            )
            .await?;
        Ok(())
    }

    async fn run_search(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        query: &str,
    ) -> Result<()> {
        core::log::record(&self.db, Some(&user.telegram_id), "search", Some(query.trim()))
            .await?;

        let hits = core::course::search_active(&self.db, query).await?;
        if hits.is_empty() {
            session.state = CheckoutState::Idle;
            self.channel
                .send_text(
                    chat_id,
                    &format!("No courses found for '{}'.", query.trim()),
                    Some(Keyboard::MainMenu),
                )
                .await?;
            return Ok(());
        }

        let rows: Vec<Vec<Button>> = hits
            .iter()
            .map(|course| {
                vec![Button::callback(
                    format!("{} — {}", course.title, price_tag(course)),
                    CallbackAction::ViewCourse(course.id),
                )]
            })
            .collect();

        session.state = CheckoutState::ViewingCourses;
        self.channel
            .send_text(
                chat_id,
                &format!("🔍 Results for '{}':", query.trim()),
                Some(Keyboard::Inline(rows)),
            )
            .await?;
        Ok(())
    }

    async fn show_category_menu(&self, chat_id: i64) -> Result<()> {
        let listings = core::category::with_active_courses(&self.db).await?;
        if listings.is_empty() {
            self.channel
                .send_text(chat_id, "No categories yet. Try 📚 Courses instead.", Some(Keyboard::MainMenu))
                .await?;
            return Ok(());
        }

        let mut rows: Vec<Vec<Button>> = listings
            .iter()
            .map(|listing| {
                vec![Button::callback(
                    format!("{} ({})", listing.category.name, listing.active_courses),
                    CallbackAction::CategoryCourses(listing.category.id),
                )]
            })
            .collect();
        rows.push(vec![Button::callback("⬅️ All courses", CallbackAction::BackToCourses)]);

        self.channel
            .send_text(chat_id, "🗂 Categories:", Some(Keyboard::Inline(rows)))
            .await?;
        Ok(())
    }

    async fn show_category_courses(
        &self,
        chat_id: i64,
        session: &mut Session,
        category_id: i32,
    ) -> Result<()> {
        let Some(category) = core::category::get_by_id(&self.db, category_id).await? else {
            self.channel
                .send_text(chat_id, "That category no longer exists.", Some(Keyboard::MainMenu))
                .await?;
            return Ok(());
        };

        let courses = core::course::list_active_in_category(&self.db, category_id).await?;
        let mut rows: Vec<Vec<Button>> = courses
            .iter()
            .map(|course| {
                vec![Button::callback(
                    format!("{} — {}", course.title, price_tag(course)),
                    CallbackAction::ViewCourse(course.id),
                )]
            })
            .collect();
        rows.push(vec![Button::callback("⬅️ Categories", CallbackAction::ShowCategoryMenu)]);

        session.state = CheckoutState::ViewingCourses;
        self.channel
            .send_text(
                chat_id,
                &format!("🗂 {}:", category.name),
                Some(Keyboard::Inline(rows)),
            )
            .await?;
        Ok(())
    }

    async fn show_purchases(&self, chat_id: i64, user: &user::Model) -> Result<()> {
        let purchases = core::payment::purchases_for_user(&self.db, user.id).await?;
        if purchases.is_empty() {
            self.channel
                .send_text(
                    chat_id,
                    "You haven't purchased anything yet. Browse 📚 Courses to get started!",
                    Some(Keyboard::MainMenu),
                )
                .await?;
            return Ok(());
        }

        let mut text = String::from("🛒 Your courses:\n");
        for purchase in &purchases {
            if let Some(course) = core::course::get_by_id(&self.db, purchase.course_id).await? {
                let link = self.deliverable_link(&course).await;
                text.push_str(&format!("\n• {}\n  {link}\n", course.title));
            }
        }

        let handle = self
            .channel
            .send_text(chat_id, &text, Some(Keyboard::MainMenu))
            .await?;
        self.schedule_cleanup(chat_id, handle).await;
        Ok(())
    }

    async fn show_policy(&self, chat_id: i64) -> Result<()> {
        let policy = core::settings::get(&self.db, core::settings::DMCA_POLICY_KEY)
            .await?
            .unwrap_or_else(|| "No store policy has been published yet.".to_string());
        self.channel
            .send_text(chat_id, &policy, Some(Keyboard::MainMenu))
            .await?;
        Ok(())
    }

    async fn prompt_course_request(&self, chat_id: i64, session: &mut Session) -> Result<()> {
        session.state = CheckoutState::AwaitingCourseRequest;
        self.channel
            .send_text(
                chat_id,
                "✉️ What course would you like us to add? Describe it in one message:",
                Some(Keyboard::RequestCancel),
            )
            .await?;
        Ok(())
    }

    async fn submit_course_request(
        &self,
        chat_id: i64,
        user: &user::Model,
        session: &mut Session,
        text: &str,
    ) -> Result<()> {
        match core::request::create(&self.db, user.id, text).await {
            Ok(_) => {
                session.state = CheckoutState::Idle;
                core::log::record(&self.db, Some(&user.telegram_id), "course_requested", None)
                    .await?;
                self.channel
                    .send_text(
                        chat_id,
                        "✅ Thanks! We'll look into adding it.",
                        Some(Keyboard::MainMenu),
                    )
                    .await?;
            }
            Err(Error::Validation { .. }) => {
                self.channel
                    .send_text(
                        chat_id,
                        "Please describe the course you'd like, or press ❌ Cancel.",
                        Some(Keyboard::RequestCancel),
                    )
                    .await?;
            }
            Err(error) => return Err(error),
        }
        Ok(())
    }

    async fn cancel(&self, chat_id: i64, session: &mut Session) -> Result<()> {
        session.state = CheckoutState::Idle;
        self.channel
            .send_text(
                chat_id,
                "Cancelled. What would you like to do next?",
                Some(Keyboard::MainMenu),
            )
            .await?;
        Ok(())
    }

    async fn course_unavailable(&self, chat_id: i64) -> Result<()> {
        self.channel
            .send_text(
                chat_id,
                "Sorry, that course is no longer available.",
                Some(Keyboard::MainMenu),
            )
            .await?;
        Ok(())
    }

    /// Sends the course link to the chat and arranges the cleanup delete.
    pub async fn deliver_course(
        &self,
        chat_id: i64,
        user: &user::Model,
        course: &course::Model,
    ) -> Result<()> {
        let link = self.deliverable_link(course).await;
        let handle = self
            .channel
            .send_text(
                chat_id,
                &format!("📦 {}\n\nYour course is ready:\n{link}", course.title),
                Some(Keyboard::MainMenu),
            )
            .await?;
        self.schedule_cleanup(chat_id, handle).await;
        core::log::record(
            &self.db,
            Some(&user.telegram_id),
            "course_delivered",
            Some(&course.title),
        )
        .await?;
        Ok(())
    }

    async fn deliverable_link(&self, course: &course::Model) -> String {
        if self.config.shorten_links {
            util::shorten_url(&course.file_link).await
        } else {
            course.file_link.clone()
        }
    }

    async fn schedule_cleanup(&self, chat_id: i64, handle: MessageHandle) {
        if !self.config.auto_delete.is_zero() {
            self.channel
                .schedule_delete(chat_id, handle, self.config.auto_delete)
                .await;
        }
    }

    async fn notify_admins(&self, text: &str) {
        for &admin_chat in &self.config.admin_chat_ids {
            if let Err(error) = self.channel.send_text(admin_chat, text, None).await {
                tracing::warn!(%error, admin_chat, "failed to notify admin chat");
            }
        }
    }

    /// Approves a payment and, when this call performed the transition,
    /// notifies the buyer and delivers the course. Safe to repeat; the
    /// transition claim is atomic, so racing approvals deliver once.
    pub async fn approve_payment(&self, payment_id: i32) -> Result<payment::Model> {
        let outcome = core::payment::approve(&self.db, payment_id).await?;

        if outcome.performed {
            core::log::record(
                &self.db,
                None,
                "payment_approved",
                Some(&format!("payment {payment_id}")),
            )
            .await?;
            self.notify_buyer_of_approval(&outcome.payment).await?;
        }
        Ok(outcome.payment)
    }

    async fn notify_buyer_of_approval(&self, payment: &payment::Model) -> Result<()> {
        let Some(buyer) = User::find_by_id(payment.user_id).one(&self.db).await? else {
            return Ok(());
        };
        let Ok(chat_id) = buyer.telegram_id.parse::<i64>() else {
            tracing::warn!(telegram_id = %buyer.telegram_id, "buyer has no numeric chat id");
            return Ok(());
        };
        let Some(course) = core::course::get_by_id(&self.db, payment.course_id).await? else {
            return Ok(());
        };

        self.channel
            .send_text(chat_id, "🎉 Your payment was approved!", None)
            .await?;
        self.deliver_course(chat_id, &buyer, &course).await
    }

    /// Rejects a payment and notifies the buyer when this call performed the
    /// transition. Safe to repeat.
    pub async fn reject_payment(&self, payment_id: i32) -> Result<payment::Model> {
        let outcome = core::payment::reject(&self.db, payment_id).await?;

        if outcome.performed {
            core::log::record(
                &self.db,
                None,
                "payment_rejected",
                Some(&format!("payment {payment_id}")),
            )
            .await?;
            if let Some(buyer) = User::find_by_id(outcome.payment.user_id).one(&self.db).await? {
                if let Ok(chat_id) = buyer.telegram_id.parse::<i64>() {
                    self.channel
                        .send_text(
                            chat_id,
                            "❌ Your payment could not be verified and was rejected. \
                             Please contact support if you believe this is a mistake.",
                            None,
                        )
                        .await?;
                }
            }
        }
        Ok(outcome.payment)
    }
}

fn price_tag(course: &course::Model) -> String {
    if course.is_free {
        "Free".to_string()
    } else {
        format!("₹{:.2}", course.price)
    }
}
