/// Input to the classifier (§4.2 step 2, §4.5).
pub struct ClassifyRequest<'a> {
    pub user_text: &'a str,
    pub attachments_present: bool,
    pub open_goal: Option<&'a str>,
}
