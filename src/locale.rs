use clap::ValueEnum;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Locale {
    #[default]
    En,
    Am,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    Welcome,
    ReturnToBot,
    JoinHeading,
    WalletHeading,
    WalletBalance,
    WalletWins,
    WalletReferrals,
    WalletInvalidBingo,
    WithdrawHeading,
    WithdrawAmount,
    WithdrawMinimum,
    WithdrawRequested,
    LeaderboardHeading,
    LeaderboardRank,
    LeaderboardName,
    LeaderboardScore,
    InviteHeading,
    InviteBlurb,
    InviteLink,
    InviteReferrals,
    InviteBonus,
    InviteSelectFriends,
    InviteNoneSelected,
    AdminHeading,
    AdminNotAuthorized,
    AdminUserIdRequired,
    AdminPendingWithdrawals,
    NetworkError,
}

impl Locale {
    pub fn text(self, message: Message) -> &'static str {
        use Message::*;
        match self {
            Locale::En => match message {
                Welcome => "You are not registered yet. Register through the bot to play.",
                ReturnToBot => "Return to bot",
                JoinHeading => "👥 Join a game",
                WalletHeading => "💰 Wallet",
                WalletBalance => "Wallet",
                WalletWins => "Games won",
                WalletReferrals => "From invited friends",
                WalletInvalidBingo => "Invalid bingo claims",
                WithdrawHeading => "💸 Withdraw",
                WithdrawAmount => "Amount (ETB)",
                WithdrawMinimum => "❌ Amount must be at least 100 ETB!",
                WithdrawRequested => "✅ Request submitted",
                LeaderboardHeading => "🏆 Leaderboard",
                LeaderboardRank => "Rank",
                LeaderboardName => "Name",
                LeaderboardScore => "Score",
                InviteHeading => "👥 Invite friends",
                InviteBlurb => "Invite friends and get 10 ETB for every 20 invites!",
                InviteLink => "Referral link",
                InviteReferrals => "Invited friends",
                InviteBonus => "Bonus",
                InviteSelectFriends => "Select friends to invite:",
                InviteNoneSelected => "Please select the friends you want to invite",
                AdminHeading => "🛠 Admin",
                AdminNotAuthorized => "Admin access not authorized!",
                AdminUserIdRequired => "Please enter a user ID",
                AdminPendingWithdrawals => "Pending withdrawals",
                NetworkError => "Network error",
            },
            Locale::Am => match message {
                Welcome => "እስካሁን አልተመዘገቡም። ለመጫወት በቦቱ ይመዝገቡ።",
                ReturnToBot => "ወደ ቦቱ ተመለስ",
                JoinHeading => "👥 ጨዋታ ይቀላቀሉ",
                WalletHeading => "💰 የዋሌት ገጽ",
                WalletBalance => "ዋሌት",
                WalletWins => "ያሸነፉት ጨዋታ",
                WalletReferrals => "ከጋበዛቿቸው ጓደኞች",
                WalletInvalidBingo => "የተሳሳተ ቢንጎ መጠየቅ",
                WithdrawHeading => "💸 ገንዘብ ለማውጣት",
                WithdrawAmount => "መጠን (ETB)",
                WithdrawMinimum => "❌ መጠን 100 ETB መሆን አለበት!",
                WithdrawRequested => "✅ ጠይቅ ተሳክቷል",
                LeaderboardHeading => "🏆 የመሪዎች ዝርዝር",
                LeaderboardRank => "ቦታ",
                LeaderboardName => "ስም",
                LeaderboardScore => "ነጥብ",
                InviteHeading => "👥 ጓደኞችን ጋብዙ",
                InviteBlurb => "ጓደኞችን ጋብዙና እና 10 ETB ለ 20 ግብዣ ያገኙ!",
                InviteLink => "የመጠቀምያ አገናኝ",
                InviteReferrals => "የተሳጭዎ ጓደኞች",
                InviteBonus => "የዕርዳታ መጠን",
                InviteSelectFriends => "ለመጋበዝ ጓደኞችን ይምረጡ:",
                InviteNoneSelected => "እባክዎ ለመጋበዝ የሚፈልጉትን ጓደኞች ይምረጡ",
                AdminHeading => "🛠 አስተዳዳሪ ገጽ",
                AdminNotAuthorized => "አስተዳዳሪነት አልተፈቀደም!",
                AdminUserIdRequired => "እባክዎ የተጠቃሚ ID ያስገቡ",
                AdminPendingWithdrawals => "በመጠባበቅ ላይ ያሉ ማውጣቶች",
                NetworkError => "አንድነት ችግር",
            },
        }
    }

    pub fn network_error(self, detail: &str) -> String {
        format!("{}: {detail}", self.text(Message::NetworkError))
    }
}
