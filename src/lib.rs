pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod google_cloud_rtdn_notification_datasource;
        pub(crate) mod google_play_developer_api_datasource;
        mod utils;
    }
    pub(crate) mod models {
        pub(crate) mod google_cloud_rtdn_notifications {
            pub(crate) mod developer_notification_model;
            pub(crate) mod pub_sub_model;
        }
        pub(crate) mod google_play_developer_api {
            pub(crate) mod in_app_product_model;
            pub(crate) mod product_purchase_model;
            pub(crate) mod subscription_purchase_v2_model;
        }
    }
    pub(crate) mod repositories {
        pub(crate) mod google_play_billing_backend;
    }
}

pub mod domain {
    pub mod entities {
        pub mod billing_failure;
        pub mod billing_result;
        pub mod product;
        pub mod product_details;
        pub mod purchase;
        pub mod settlement;
    }
    pub mod logic {
        pub mod classifier;
        pub mod event_relay;
        pub mod settlement_executor;
    }
    pub mod repositories {
        pub mod billing_backend;
    }
}

pub mod config;
mod constants;
pub mod errors;
pub mod service;

pub use data::repositories::google_play_billing_backend::GooglePlayBillingBackend;
