use crate::reports::ReportsView;
use askama::Template;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub provider_id: String,
    pub callback_url: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub user_identity: String,
    pub reports: ReportsView,
}
