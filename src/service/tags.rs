/// Interest tags offered to users at signup and to organisers when tagging
/// events. Free-text tags are still accepted; this is the suggested set.
pub const PREDEFINED_TAGS: &[&str] = &[
    "Academic",
    "Art",
    "Career",
    "Coding",
    "Community Service",
    "Cultural",
    "Dance",
    "Debate",
    "Entrepreneurship",
    "Environment",
    "Film",
    "Fitness",
    "Food",
    "Gaming",
    "Greek Life",
    "Health",
    "Language Exchange",
    "Music",
    "Networking",
    "Outdoors",
    "Photography",
    "Politics",
    "Research",
    "Social",
    "Sports",
    "Study Group",
    "Tech",
    "Theater",
    "Travel",
    "Volunteer",
    "Workshop",
    "Writing",
];
