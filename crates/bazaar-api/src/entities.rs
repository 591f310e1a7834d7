//! Collection names, filterable fields and response keys per entity.

use bazaar_engine::{EmbeddedField, Listing, Projection};
use bazaar_query::fields;

pub const USERS: &str = "users";
pub const CATEGORIES: &str = "categories";
pub const BRANDS: &str = "brands";
pub const PRODUCTS: &str = "products";
pub const PROJECTS: &str = "projects";
pub const POSTS: &str = "posts";
pub const QUESTIONS: &str = "questions";
pub const ANSWERS: &str = "answers";
pub const REVIEWS: &str = "reviews";
pub const ORDERS: &str = "orders";
pub const MESSAGES: &str = "messages";
pub const NOTIFICATIONS: &str = "notifications";
pub const FOLLOWS: &str = "follows";
pub const ENQUIRIES: &str = "enquiries";

/// Never leaves the service.
pub const PUBLIC_USER: Projection = Projection::Exclude(&["password", "token"]);
/// Author card shown next to questions, answers and reviews.
pub const AUTHOR: Projection = Projection::Include(&["fname", "lname", "profileImage", "address"]);

pub const DELIVERY_ADDRESSES: EmbeddedField = EmbeddedField::new("deliveryAddresses", "Delivery address");
pub const SUB_CATEGORIES: EmbeddedField = EmbeddedField::new("subCategories", "Subcategory");
pub const TYPES: EmbeddedField = EmbeddedField::new("types", "Type");
/// Every nested level of a category tree that carries its own ids.
pub const CATEGORY_LEVELS: &[&str] = &["subCategories", "types", "subTypes"];

pub const USER_ROLES: &[&str] = &["Realtor", "Product Seller", "Professionals", "Home Owner"];
pub const ORDER_STATUSES: &[&str] = &["pending", "shipped", "delivered", "cancelled"];

const fn listing(total_key: &'static str, items_key: &'static str) -> Listing {
    Listing {
        total_key,
        items_key,
    }
}

pub const CATEGORY_LISTING: Listing = listing("totalCategories", "categories");
pub const SUB_CATEGORY_LISTING: Listing = listing("totalSubCategories", "subCategories");
pub const BRAND_LISTING: Listing = listing("totalBrands", "brands");
pub const PRODUCT_LISTING: Listing = listing("totalProducts", "products");
pub const PROJECT_LISTING: Listing = listing("totalProjects", "projects");
pub const POST_LISTING: Listing = listing("totalPosts", "posts");
pub const QUESTION_LISTING: Listing = listing("totalQuestions", "questions");
pub const ANSWER_LISTING: Listing = listing("totalAnswers", "answers");
pub const REVIEW_LISTING: Listing = listing("totalReviews", "reviews");
pub const ORDER_LISTING: Listing = listing("totalOrders", "orders");
pub const CONVERSATION_LISTING: Listing = listing("totalConversations", "conversations");
pub const NOTIFICATION_LISTING: Listing = listing("totalNotifications", "notifications");
pub const FOLLOWER_LISTING: Listing = listing("totalFollowers", "followers");
pub const FOLLOWING_LISTING: Listing = listing("totalFollowing", "following");

fields! {
    pub enum UserField {
        PhoneNumber => "phoneNumber",
    }
}

fields! {
    pub enum CategoryField {
        Name => "name",
        Description => "description",
        CreatedAt => "createdAt",
    }
}

fields! {
    pub enum BrandField {
        Name => "name",
        Approved => "adminApproved",
        CreatedAt => "createdAt",
    }
}

fields! {
    pub enum ProductField {
        SellerName => "seller.name",
        SellerPhoneNumber => "seller.phoneNumber",
        Name => "name",
        About => "about",
        Category => "category",
        SubCategory => "subCategory",
        Type => "type",
        SubType => "subType",
        Brand => "technicalDetails.brand",
        Color => "technicalDetails.color",
        Material => "technicalDetails.material",
        Tags => "tags",
        Price => "price",
        Quantity => "quantity",
        Warranty => "warrantyAndCertifications.warranty",
        IsoCertified => "warrantyAndCertifications.isoCertified",
        AverageRating => "averageRating",
        CreatedBy => "createdBy",
        CreatedAt => "createdAt",
    }
}

fields! {
    pub enum ProjectField {
        SellerName => "sellerName",
        SellerPhoneNumber => "sellerPhoneNumber",
        Title => "title",
        About => "about",
        ProjectType => "projectType",
        ConstructionType => "constructionType",
        HouseType => "houseType",
        Style => "style",
        Layout => "layout",
        Place => "projectLocation.place",
        Cost => "cost",
        Area => "areaSquareFeet",
        Tags => "tags",
        BoundaryWall => "boundaryWall",
        CornerProperty => "cornerProperty",
        AverageRating => "averageRating",
        CreatedBy => "createdBy",
        CreatedAt => "createdAt",
    }
}

fields! {
    pub enum PostField {
        Title => "title",
        Captions => "captions",
        Tags => "tags",
        Place => "location.place",
        PriceType => "priceDetails.priceType",
        Amount => "priceDetails.amount",
        CreatedBy => "createdBy",
        CreatedAt => "createdAt",
    }
}

fields! {
    pub enum QuestionField {
        Title => "title",
        Description => "description",
        Tags => "tags",
        User => "user",
        Votes => "votes",
        Views => "views",
        CreatedAt => "createdAt",
    }
}

fields! {
    pub enum AnswerField {
        Question => "question",
        User => "user",
        Parent => "parent",
        CreatedAt => "createdAt",
    }
}

fields! {
    pub enum ReviewField {
        Reviewable => "reviewable",
        User => "user",
        Parent => "parent",
        Rating => "rating",
        CreatedAt => "createdAt",
    }
}

fields! {
    pub enum OrderField {
        Status => "orderStatus",
        User => "user",
        Seller => "product.createdBy",
    }
}

fields! {
    pub enum MessageField {
        Sender => "sender",
        Receiver => "receiver",
        CreatedAt => "createdAt",
    }
}

fields! {
    pub enum NotificationField {
        User => "userId",
        SentAt => "sentAt",
    }
}

fields! {
    /// One edge per (follower, followed user) pair.
    pub enum FollowField {
        Follower => "follower",
        Following => "following",
        CreatedAt => "createdAt",
    }
}
